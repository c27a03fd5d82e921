// Request client for the upstream search API. Every call goes through the
// response cache first; a failing cache backend degrades to always-miss
// instead of taking the lookup path down.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{self, ResponseCache, RESPONSE_TTL};
use crate::itinerary::{AirlineDirectory, Journey};
use crate::normalize::{self, NormalizeError};
use crate::upstream::{AirlineRecord, MultiLegResult, RoundTripResponse};

// Upstream expects day-first dates.
const DATE_FMT: &str = "%d/%m/%Y";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("unexpected response shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub partner: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.skypicker.com".to_string(),
            partner: "picky".to_string(),
        }
    }
}

// One independently-searched leg of a multi-leg itinerary. A per-leg
// max_fly_duration overrides the search-wide one.
#[derive(Debug, Clone)]
pub struct LegSpec {
    pub origin: String,
    pub destination: String,
    pub departure_window: (NaiveDate, NaiveDate),
    pub max_fly_duration: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

// Transport seam; production uses reqwest, tests script replies in memory.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    async fn execute(
        &self,
        method: &str,
        url: &str,
        params: &BTreeMap<String, String>,
        body: Option<&Value>,
    ) -> Result<HttpReply, ApiError>;
}

#[derive(Default)]
pub struct ReqwestBackend {
    http: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn execute(
        &self,
        method: &str,
        url: &str,
        params: &BTreeMap<String, String>,
        body: Option<&Value>,
    ) -> Result<HttpReply, ApiError> {
        let mut request = if method.eq_ignore_ascii_case("POST") {
            self.http.post(url)
        } else {
            self.http.get(url)
        };
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }
}

pub struct FlightClient {
    config: ClientConfig,
    backend: Box<dyn HttpBackend>,
    cache: Box<dyn ResponseCache>,
}

impl FlightClient {
    pub fn new(
        config: ClientConfig,
        backend: Box<dyn HttpBackend>,
        cache: Box<dyn ResponseCache>,
    ) -> Self {
        Self {
            config,
            backend,
            cache,
        }
    }

    // Round-trip search: both legs in one query, normalized to one journey
    // per result.
    pub async fn search_round_trip(
        &self,
        origin: &str,
        destination: &str,
        departure_window: (NaiveDate, NaiveDate),
        return_window: (NaiveDate, NaiveDate),
        max_fly_duration: Option<u32>,
    ) -> Result<Vec<Journey>, ApiError> {
        let raw = self
            .round_trip_data(
                origin,
                destination,
                departure_window,
                return_window,
                max_fly_duration,
            )
            .await?;
        let response: RoundTripResponse = serde_json::from_value(raw)?;
        Ok(normalize::journeys_from_round_trip(response)?)
    }

    pub async fn round_trip_data(
        &self,
        origin: &str,
        destination: &str,
        departure_window: (NaiveDate, NaiveDate),
        return_window: (NaiveDate, NaiveDate),
        max_fly_duration: Option<u32>,
    ) -> Result<Value, ApiError> {
        let mut params = BTreeMap::from([
            ("partner".to_string(), self.config.partner.clone()),
            ("flyFrom".to_string(), origin.to_string()),
            ("to".to_string(), destination.to_string()),
            (
                "dateFrom".to_string(),
                departure_window.0.format(DATE_FMT).to_string(),
            ),
            (
                "dateTo".to_string(),
                departure_window.1.format(DATE_FMT).to_string(),
            ),
            (
                "returnFrom".to_string(),
                return_window.0.format(DATE_FMT).to_string(),
            ),
            (
                "returnTo".to_string(),
                return_window.1.format(DATE_FMT).to_string(),
            ),
            ("typeFlight".to_string(), "round".to_string()),
        ]);
        if let Some(max) = max_fly_duration {
            params.insert("maxFlyDuration".to_string(), max.to_string());
        }

        self.request(
            "GET",
            &format!("{}/flights", self.config.base_url),
            &params,
            None,
        )
        .await
    }

    // Multi-leg search: every leg is submitted as an independent one-way
    // request bundled into a single POST.
    pub async fn search_multi_leg(
        &self,
        legs: &[LegSpec],
        max_fly_duration: Option<u32>,
    ) -> Result<Vec<Journey>, ApiError> {
        let raw = self.multi_leg_data(legs, max_fly_duration).await?;
        let results: Vec<MultiLegResult> = serde_json::from_value(raw)?;
        Ok(normalize::journeys_from_multi_leg(results)?)
    }

    pub async fn multi_leg_data(
        &self,
        legs: &[LegSpec],
        max_fly_duration: Option<u32>,
    ) -> Result<Value, ApiError> {
        let requests: Vec<Value> = legs
            .iter()
            .map(|leg| {
                let mut request = serde_json::Map::new();
                request.insert("flyFrom".to_string(), json!(leg.origin));
                request.insert("to".to_string(), json!(leg.destination));
                request.insert(
                    "dateFrom".to_string(),
                    json!(leg.departure_window.0.format(DATE_FMT).to_string()),
                );
                request.insert(
                    "dateTo".to_string(),
                    json!(leg.departure_window.1.format(DATE_FMT).to_string()),
                );
                request.insert("typeFlight".to_string(), json!("oneway"));
                if let Some(max) = leg.max_fly_duration.or(max_fly_duration) {
                    request.insert("maxFlyDuration".to_string(), json!(max));
                }
                Value::Object(request)
            })
            .collect();

        let body = json!({ "requests": requests });
        self.request(
            "POST",
            &format!("{}/flights_multi", self.config.base_url),
            &BTreeMap::new(),
            Some(&body),
        )
        .await
    }

    // Airline directory, fetched once per session by callers that want
    // display names.
    pub async fn lookup_airlines(&self) -> Result<AirlineDirectory, ApiError> {
        let raw = self
            .request(
                "GET",
                &format!("{}/airlines", self.config.base_url),
                &BTreeMap::new(),
                None,
            )
            .await?;
        let records: Vec<AirlineRecord> = serde_json::from_value(raw)?;
        Ok(AirlineDirectory::new(
            records.into_iter().map(|r| (r.id, r.name)).collect(),
        ))
    }

    async fn request(
        &self,
        method: &str,
        url: &str,
        params: &BTreeMap<String, String>,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let key = cache::request_key(
            method,
            url,
            (!params.is_empty()).then_some(params),
            body,
        );

        match self.cache.get(&key).await {
            Ok(Some(payload)) => {
                debug!(method, url, "cache hit");
                return Ok(serde_json::from_str(&payload)?);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "cache lookup failed, treating as miss");
            }
        }

        debug!(method, url, "requesting upstream");
        let reply = self.backend.execute(method, url, params, body).await?;
        if (400..600).contains(&reply.status) {
            warn!(status = reply.status, body = %reply.body, "upstream error");
            return Err(ApiError::UpstreamStatus {
                status: reply.status,
                body: reply.body,
            });
        }

        let value: Value = serde_json::from_str(&reply.body)?;
        if let Err(err) = self.cache.set(&key, &reply.body, RESPONSE_TTL).await {
            warn!(error = %err, "cache store failed, response not cached");
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, MemoryCache};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct RecordedCall {
        method: String,
        url: String,
        params: BTreeMap<String, String>,
        body: Option<Value>,
    }

    // Scripted transport: hands out canned replies in order and records
    // every call so tests can assert on the wire format.
    #[derive(Clone, Default)]
    struct ScriptedBackend {
        replies: Arc<Mutex<VecDeque<HttpReply>>>,
        calls: Arc<AtomicUsize>,
        recorded: Arc<Mutex<Vec<RecordedCall>>>,
    }

    impl ScriptedBackend {
        fn with_replies(replies: Vec<HttpReply>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into())),
                ..Self::default()
            }
        }

        fn ok(body: &str) -> HttpReply {
            HttpReply {
                status: 200,
                body: body.to_string(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpBackend for ScriptedBackend {
        async fn execute(
            &self,
            method: &str,
            url: &str,
            params: &BTreeMap<String, String>,
            body: Option<&Value>,
        ) -> Result<HttpReply, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.recorded.lock().unwrap().push(RecordedCall {
                method: method.to_string(),
                url: url.to_string(),
                params: params.clone(),
                body: body.cloned(),
            });
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Self::ok("{}"));
            Ok(reply)
        }
    }

    // Cache stand-in for a backend outage.
    struct DownCache;

    fn backend_down() -> CacheError {
        CacheError::Backend(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "cache down",
        )))
    }

    #[async_trait]
    impl ResponseCache for DownCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(backend_down())
        }

        async fn set(
            &self,
            _key: &str,
            _payload: &str,
            _ttl: Duration,
        ) -> Result<(), CacheError> {
            Err(backend_down())
        }
    }

    fn test_config() -> ClientConfig {
        ClientConfig {
            base_url: "https://api.test".to_string(),
            partner: "picky".to_string(),
        }
    }

    fn client_with(backend: ScriptedBackend) -> FlightClient {
        FlightClient::new(
            test_config(),
            Box::new(backend),
            Box::new(MemoryCache::new()),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn round_trip_builds_expected_query() {
        let backend = ScriptedBackend::with_replies(vec![ScriptedBackend::ok(r#"{"data": []}"#)]);
        let client = client_with(backend.clone());

        let journeys = client
            .search_round_trip(
                "TLL,HEL,RIX",
                "SYD",
                (date(2018, 8, 19), date(2018, 8, 22)),
                (date(2018, 9, 3), date(2018, 9, 10)),
                Some(36),
            )
            .await
            .unwrap();
        assert!(journeys.is_empty());

        let recorded = backend.recorded.lock().unwrap();
        let call = &recorded[0];
        assert_eq!(call.method, "GET");
        assert_eq!(call.url, "https://api.test/flights");
        assert_eq!(call.params["partner"], "picky");
        assert_eq!(call.params["flyFrom"], "TLL,HEL,RIX");
        assert_eq!(call.params["to"], "SYD");
        assert_eq!(call.params["dateFrom"], "19/08/2018");
        assert_eq!(call.params["dateTo"], "22/08/2018");
        assert_eq!(call.params["returnFrom"], "03/09/2018");
        assert_eq!(call.params["returnTo"], "10/09/2018");
        assert_eq!(call.params["typeFlight"], "round");
        assert_eq!(call.params["maxFlyDuration"], "36");
        assert!(call.body.is_none());
    }

    #[tokio::test]
    async fn identical_requests_within_ttl_hit_upstream_once() {
        let backend = ScriptedBackend::with_replies(vec![ScriptedBackend::ok(r#"{"data": []}"#)]);
        let client = client_with(backend.clone());
        let windows = ((date(2018, 8, 19), date(2018, 8, 22)), (date(2018, 9, 3), date(2018, 9, 10)));

        let first = client
            .round_trip_data("HEL", "SYD", windows.0, windows.1, None)
            .await
            .unwrap();
        let second = client
            .round_trip_data("HEL", "SYD", windows.0, windows.1, None)
            .await
            .unwrap();

        assert_eq!(backend.calls(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn expired_cache_entry_triggers_one_new_upstream_call() {
        let backend = ScriptedBackend::with_replies(vec![ScriptedBackend::ok(r#"{"data": []}"#)]);
        let cache = Arc::new(MemoryCache::new());
        let client = FlightClient::new(
            test_config(),
            Box::new(backend.clone()),
            Box::new(cache.clone()),
        );

        // Seed the exact key the client builds, already expired.
        let params = BTreeMap::from([
            ("partner".to_string(), "picky".to_string()),
            ("flyFrom".to_string(), "HEL".to_string()),
            ("to".to_string(), "SYD".to_string()),
            ("dateFrom".to_string(), "19/08/2018".to_string()),
            ("dateTo".to_string(), "22/08/2018".to_string()),
            ("returnFrom".to_string(), "03/09/2018".to_string()),
            ("returnTo".to_string(), "10/09/2018".to_string()),
            ("typeFlight".to_string(), "round".to_string()),
        ]);
        let key = cache::request_key("GET", "https://api.test/flights", Some(&params), None);
        cache
            .set(&key, r#"{"data": ["stale"]}"#, Duration::ZERO)
            .await
            .unwrap();

        let value = client
            .round_trip_data(
                "HEL",
                "SYD",
                (date(2018, 8, 19), date(2018, 8, 22)),
                (date(2018, 9, 3), date(2018, 9, 10)),
                None,
            )
            .await
            .unwrap();

        // The stale entry was evicted and exactly one live call happened.
        assert_eq!(backend.calls(), 1);
        assert_eq!(value, json!({"data": []}));
        assert_eq!(cache.stats().expired_count, 1);
    }

    #[tokio::test]
    async fn different_parameters_miss_the_cache() {
        let backend = ScriptedBackend::default();
        let client = client_with(backend.clone());
        let windows = ((date(2018, 8, 19), date(2018, 8, 22)), (date(2018, 9, 3), date(2018, 9, 10)));

        client
            .round_trip_data("HEL", "SYD", windows.0, windows.1, None)
            .await
            .unwrap();
        client
            .round_trip_data("RIX", "SYD", windows.0, windows.1, None)
            .await
            .unwrap();

        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn upstream_error_is_fatal_and_never_cached() {
        let backend = ScriptedBackend::with_replies(vec![
            HttpReply {
                status: 500,
                body: "boom".to_string(),
            },
            ScriptedBackend::ok(r#"{"data": []}"#),
        ]);
        let client = client_with(backend.clone());
        let windows = ((date(2018, 8, 19), date(2018, 8, 22)), (date(2018, 9, 3), date(2018, 9, 10)));

        let err = client
            .round_trip_data("HEL", "SYD", windows.0, windows.1, None)
            .await
            .unwrap_err();
        match err {
            ApiError::UpstreamStatus { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected UpstreamStatus, got {other:?}"),
        }

        // The failure was not cached, so the retry goes upstream again.
        client
            .round_trip_data("HEL", "SYD", windows.0, windows.1, None)
            .await
            .unwrap();
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn cache_outage_degrades_to_always_miss() {
        let backend = ScriptedBackend::default();
        let client = FlightClient::new(test_config(), Box::new(backend.clone()), Box::new(DownCache));
        let windows = ((date(2018, 8, 19), date(2018, 8, 22)), (date(2018, 9, 3), date(2018, 9, 10)));

        client
            .round_trip_data("HEL", "SYD", windows.0, windows.1, None)
            .await
            .unwrap();
        client
            .round_trip_data("HEL", "SYD", windows.0, windows.1, None)
            .await
            .unwrap();

        // Both lookups succeeded despite the dead cache backend.
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn multi_leg_posts_one_oneway_request_per_leg() {
        let backend = ScriptedBackend::with_replies(vec![ScriptedBackend::ok("[]")]);
        let client = client_with(backend.clone());

        let legs = vec![
            LegSpec {
                origin: "TLL,HEL,RIX".to_string(),
                destination: "SYD".to_string(),
                departure_window: (date(2018, 8, 19), date(2018, 8, 22)),
                max_fly_duration: Some(32),
            },
            LegSpec {
                origin: "MEL".to_string(),
                destination: "SIN".to_string(),
                departure_window: (date(2018, 9, 3), date(2018, 9, 10)),
                max_fly_duration: None,
            },
        ];
        let journeys = client.search_multi_leg(&legs, Some(40)).await.unwrap();
        assert!(journeys.is_empty());

        let recorded = backend.recorded.lock().unwrap();
        let call = &recorded[0];
        assert_eq!(call.method, "POST");
        assert_eq!(call.url, "https://api.test/flights_multi");
        assert!(call.params.is_empty());

        let requests = call.body.as_ref().unwrap()["requests"].as_array().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["flyFrom"], "TLL,HEL,RIX");
        assert_eq!(requests[0]["typeFlight"], "oneway");
        // The per-leg limit wins over the search-wide one.
        assert_eq!(requests[0]["maxFlyDuration"], 32);
        assert_eq!(requests[1]["dateFrom"], "03/09/2018");
        assert_eq!(requests[1]["maxFlyDuration"], 40);
    }

    #[tokio::test]
    async fn lookup_airlines_builds_directory() {
        let backend = ScriptedBackend::with_replies(vec![ScriptedBackend::ok(
            r#"[{"id": "AY", "name": "Finnair"}, {"id": "BT", "name": "Air Baltic"}]"#,
        )]);
        let client = client_with(backend);

        let directory = client.lookup_airlines().await.unwrap();
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.name("AY"), Some("Finnair"));
        assert_eq!(directory.name("BT"), Some("Air Baltic"));
    }

    #[tokio::test]
    async fn malformed_search_payload_is_a_shape_error() {
        let backend = ScriptedBackend::with_replies(vec![ScriptedBackend::ok(
            r#"{"data": [{"route": []}]}"#,
        )]);
        let client = client_with(backend);
        let windows = ((date(2018, 8, 19), date(2018, 8, 22)), (date(2018, 9, 3), date(2018, 9, 10)));

        let err = client
            .search_round_trip("HEL", "SYD", windows.0, windows.1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Shape(_)));
    }
}
