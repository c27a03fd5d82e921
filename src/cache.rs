// Response cache keyed by a canonical serialization of the outbound request.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

// Raw responses stay valid for one hour; there is no manual invalidation.
pub const RESPONSE_TTL: Duration = Duration::from_secs(3600);

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Backend(#[from] redis::RedisError),
}

// Canonical key for one outbound request. Params ride in a BTreeMap and
// serde_json serializes maps with sorted keys, so insertion order never
// changes the key; the method is uppercased for the same reason.
pub fn request_key(
    method: &str,
    url: &str,
    params: Option<&BTreeMap<String, String>>,
    body: Option<&Value>,
) -> String {
    json!([method.to_uppercase(), url, params, body]).to_string()
}

// Storage seam for the request client. The client treats a failing backend
// as a permanent miss, so implementations report errors instead of panicking.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), CacheError>;
}

// Callers that keep their own handle to a cache can share it with a client.
#[async_trait]
impl<T: ResponseCache + ?Sized> ResponseCache for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), CacheError> {
        (**self).set(key, payload, ttl).await
    }
}

// Redis-backed cache; per-key expiry is delegated to the server via SET EX.
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    pub fn new(connection_string: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResponseCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(key).await?;
        Ok(payload)
    }

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(key, payload, ttl.as_secs()).await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct CacheStats {
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
    expired_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hit_count: usize,
    pub miss_count: usize,
    pub expired_count: usize,
}

// In-memory cache with lazy expiry on lookup. Stands in for Redis in tests
// and benches, and works as a per-process cache when no backend is running.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, MemoryEntry>,
    stats: CacheStats,
}

struct MemoryEntry {
    payload: String,
    expires_at: Instant,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hit_count: self.stats.hit_count.load(Ordering::Relaxed),
            miss_count: self.stats.miss_count.load(Ordering::Relaxed),
            expired_count: self.stats.expired_count.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if let Some(entry) = self.entries.get(key) {
            if Instant::now() < entry.expires_at {
                self.stats.hit_count.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(entry.payload.clone()));
            }
            drop(entry);
            self.entries.remove(key);
            self.stats.expired_count.fetch_add(1, Ordering::Relaxed);
            debug!(key, "cache entry expired");
        }
        self.stats.miss_count.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                payload: payload.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}
