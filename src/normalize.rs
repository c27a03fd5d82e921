// Converts raw route segments into the Hop/Flight/Journey graph.
//
// Timestamp policy: all six wire timestamps are epoch seconds and every one
// of them is decoded through chrono's UTC epoch constructor. The UTC pair
// becomes DateTime<Utc>; the local pair is already shifted to airport wall
// clock by upstream, so it is kept as NaiveDateTime with no zone attached.
// The host timezone is never consulted. Durations use the UTC pair only.

use thiserror::Error;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::itinerary::{Flight, Hop, Journey};
use crate::upstream::{MultiLegResult, RoundTripResponse, RoundTripResult, RouteSegment};

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("timestamp {0} is not representable as a date-time")]
    TimestampOutOfRange(i64),

    #[error("segment {dep_airport}-{arr_airport} arrives before it departs")]
    ArrivalBeforeDeparture {
        dep_airport: String,
        arr_airport: String,
    },
}

pub(crate) fn utc_from_epoch(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

pub(crate) fn naive_from_epoch(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

// Round-trip payloads report one combined price; it is split evenly between
// the outbound and inbound flights. Upstream does not state how the price
// decomposes, so half each is a documented assumption.
pub fn journeys_from_round_trip(
    response: RoundTripResponse,
) -> Result<Vec<Journey>, NormalizeError> {
    response
        .data
        .into_iter()
        .map(journey_from_round_trip_result)
        .collect()
}

pub fn journey_from_round_trip_result(
    result: RoundTripResult,
) -> Result<Journey, NormalizeError> {
    let (outbound, inbound): (Vec<_>, Vec<_>) = result
        .route
        .into_iter()
        .partition(|segment| segment.return_leg == 0);

    let outbound = hops_from_segments(outbound)?;
    let inbound = hops_from_segments(inbound)?;

    let half_price = result.price / 2.0;
    Ok(Journey::new(vec![
        Flight::new(outbound, half_price),
        Flight::new(inbound, half_price),
    ]))
}

// Multi-leg payloads already group segments per leg with their own price;
// each group maps to one flight, prices untouched.
pub fn journeys_from_multi_leg(
    results: Vec<MultiLegResult>,
) -> Result<Vec<Journey>, NormalizeError> {
    results
        .into_iter()
        .map(|result| {
            let flights = result
                .route
                .into_iter()
                .map(|leg| Ok(Flight::new(hops_from_segments(leg.route)?, leg.price)))
                .collect::<Result<Vec<_>, NormalizeError>>()?;
            Ok(Journey::new(flights))
        })
        .collect()
}

fn hops_from_segments(segments: Vec<RouteSegment>) -> Result<Vec<Hop>, NormalizeError> {
    segments.into_iter().map(hop_from_segment).collect()
}

fn hop_from_segment(segment: RouteSegment) -> Result<Hop, NormalizeError> {
    let dep_time_utc = utc_from_epoch(segment.dep_utc)
        .ok_or(NormalizeError::TimestampOutOfRange(segment.dep_utc))?;
    let arr_time_utc = utc_from_epoch(segment.arr_utc)
        .ok_or(NormalizeError::TimestampOutOfRange(segment.arr_utc))?;
    let dep_time = naive_from_epoch(segment.dep_local)
        .ok_or(NormalizeError::TimestampOutOfRange(segment.dep_local))?;
    let arr_time = naive_from_epoch(segment.arr_local)
        .ok_or(NormalizeError::TimestampOutOfRange(segment.arr_local))?;

    if arr_time_utc < dep_time_utc {
        return Err(NormalizeError::ArrivalBeforeDeparture {
            dep_airport: segment.fly_from,
            arr_airport: segment.fly_to,
        });
    }

    Ok(Hop::new(
        segment.fly_from,
        segment.fly_to,
        dep_time,
        arr_time,
        dep_time_utc,
        arr_time_utc,
        segment.airline,
    ))
}
