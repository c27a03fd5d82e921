// Raw response shapes as the search API sends them. Parsed at the boundary;
// nothing downstream touches loose JSON.

use serde::{Deserialize, Deserializer};

// Round-trip search: one object with a `data` list of priced results.
#[derive(Debug, Clone, Deserialize)]
pub struct RoundTripResponse {
    pub data: Vec<RoundTripResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoundTripResult {
    #[serde(deserialize_with = "price_from_number_or_string")]
    pub price: f64,
    pub route: Vec<RouteSegment>,
}

// Multi-leg search: a top-level list, one group per submitted itinerary,
// where every leg carries its own price and segments.
#[derive(Debug, Clone, Deserialize)]
pub struct MultiLegResult {
    pub route: Vec<MultiLegFlight>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MultiLegFlight {
    #[serde(deserialize_with = "price_from_number_or_string")]
    pub price: f64,
    pub route: Vec<RouteSegment>,
}

// One route segment. The four timestamps are integer seconds since the Unix
// epoch; the local pair is pre-shifted to airport wall clock by upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteSegment {
    #[serde(rename = "flyFrom")]
    pub fly_from: String,
    #[serde(rename = "flyTo")]
    pub fly_to: String,
    #[serde(rename = "dTime")]
    pub dep_local: i64,
    #[serde(rename = "aTime")]
    pub arr_local: i64,
    #[serde(rename = "dTimeUTC")]
    pub dep_utc: i64,
    #[serde(rename = "aTimeUTC")]
    pub arr_utc: i64,
    pub airline: String,
    // Only round-trip payloads tag segments; 0 = outbound, 1 = inbound.
    #[serde(rename = "return", default)]
    pub return_leg: u8,
}

// Airline directory: a flat list of id/name records.
#[derive(Debug, Clone, Deserialize)]
pub struct AirlineRecord {
    pub id: String,
    pub name: String,
}

// Upstream quotes prices both as numbers and as numeric strings.
fn price_from_number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPrice {
        Number(f64),
        Text(String),
    }

    match RawPrice::deserialize(deserializer)? {
        RawPrice::Number(n) => Ok(n),
        RawPrice::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
