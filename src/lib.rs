// Flight search client: queries the Skypicker API, caches raw responses,
// normalizes the three upstream payload shapes into one itinerary graph and
// ranks journeys by a weighted cost score.

pub mod booking;
pub mod cache;
pub mod client;
pub mod display;
pub mod itinerary;
pub mod normalize;
pub mod scoring;
pub mod upstream;

// Re-export key types for convenience
pub use booking::{fetch_confirmation, BookingConfirmation, BookingError};
pub use cache::{CacheError, MemoryCache, RedisCache, ResponseCache, RESPONSE_TTL};
pub use client::{
    ApiError, ClientConfig, FlightClient, HttpBackend, HttpReply, LegSpec, ReqwestBackend,
};
pub use itinerary::{AirlineDirectory, Flight, Hop, Journey, ScoreBreakdown};
pub use normalize::NormalizeError;
pub use scoring::{AirportCost, ScoreError, Scorer};
