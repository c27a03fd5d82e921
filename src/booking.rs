// Booking-confirmation formatter. Consumes the confirmation document's own
// schema (nested where/when per endpoint) and renders one line per flight;
// it shares nothing with the search cache or normalizer beyond the epoch
// decode policy.

use serde::Deserialize;
use thiserror::Error;

use crate::normalize::naive_from_epoch;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("unexpected response shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("timestamp {0} is not representable as a date-time")]
    TimestampOutOfRange(i64),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfirmation {
    pub bid: u64,
    pub flights: Vec<BookingFlight>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingFlight {
    pub departure: BookingStop,
    pub arrival: BookingStop,
    pub airline: BookingAirline,
    pub flight_no: u32,
    pub reservation_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingStop {
    #[serde(rename = "where")]
    pub place: BookingPlace,
    pub when: BookingTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingPlace {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingTime {
    pub local: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingAirline {
    pub iata: String,
    pub name: String,
}

pub async fn fetch_confirmation(
    http: &reqwest::Client,
    url: &str,
) -> Result<BookingConfirmation, BookingError> {
    let response = http.get(url).send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;
    if (400..600).contains(&status) {
        return Err(BookingError::UpstreamStatus { status, body });
    }
    Ok(serde_json::from_str(&body)?)
}

pub fn render(confirmation: &BookingConfirmation) -> Result<String, BookingError> {
    let mut lines = vec![format!("Kiwi booking {}", confirmation.bid)];
    for flight in &confirmation.flights {
        lines.push(flight_line(flight)?);
    }
    Ok(lines.join("\n"))
}

pub fn flight_line(flight: &BookingFlight) -> Result<String, BookingError> {
    let dep_time = naive_from_epoch(flight.departure.when.local)
        .ok_or(BookingError::TimestampOutOfRange(flight.departure.when.local))?;
    let arr_time = naive_from_epoch(flight.arrival.when.local)
        .ok_or(BookingError::TimestampOutOfRange(flight.arrival.when.local))?;
    let full_flight_no = format!("{}-{}", flight.airline.iata, flight.flight_no);

    Ok(format!(
        "- {} - {}: flight {}-{}  {:<7} ({}); {}",
        dep_time.format("%a %m-%d  %H:%M"),
        arr_time.format("%H:%M"),
        flight.departure.place.code,
        flight.arrival.place.code,
        full_flight_no,
        flight.airline.name,
        flight.reservation_number,
    ))
}
