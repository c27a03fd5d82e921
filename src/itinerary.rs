// Entity graph for normalized search results: Hop -> Flight -> Journey.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

// One physical flight segment between two airports. Immutable once built;
// local times carry no zone, durations come from the UTC pair only.
#[derive(Debug, Clone, PartialEq)]
pub struct Hop {
    dep_airport: String,
    arr_airport: String,
    dep_time: NaiveDateTime,
    arr_time: NaiveDateTime,
    dep_time_utc: DateTime<Utc>,
    arr_time_utc: DateTime<Utc>,
    airline: String,
}

impl Hop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dep_airport: String,
        arr_airport: String,
        dep_time: NaiveDateTime,
        arr_time: NaiveDateTime,
        dep_time_utc: DateTime<Utc>,
        arr_time_utc: DateTime<Utc>,
        airline: String,
    ) -> Self {
        Self {
            dep_airport,
            arr_airport,
            dep_time,
            arr_time,
            dep_time_utc,
            arr_time_utc,
            airline,
        }
    }

    pub fn dep_airport(&self) -> &str {
        &self.dep_airport
    }

    pub fn arr_airport(&self) -> &str {
        &self.arr_airport
    }

    pub fn dep_time(&self) -> NaiveDateTime {
        self.dep_time
    }

    pub fn arr_time(&self) -> NaiveDateTime {
        self.arr_time
    }

    pub fn dep_time_utc(&self) -> DateTime<Utc> {
        self.dep_time_utc
    }

    pub fn arr_time_utc(&self) -> DateTime<Utc> {
        self.arr_time_utc
    }

    pub fn airline(&self) -> &str {
        &self.airline
    }

    pub fn duration(&self) -> TimeDelta {
        self.arr_time_utc - self.dep_time_utc
    }
}

// One priced unit of one or more connecting hops. A flight may come back
// from the normalizer with zero hops (upstream sends an empty leg); every
// derived accessor is Option so callers cannot silently default.
#[derive(Debug, Clone, PartialEq)]
pub struct Flight {
    hops: Vec<Hop>,
    price: f64,
}

impl Flight {
    pub fn new(hops: Vec<Hop>, price: f64) -> Self {
        Self { hops, price }
    }

    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn dep_airport(&self) -> Option<&str> {
        self.hops.first().map(Hop::dep_airport)
    }

    pub fn arr_airport(&self) -> Option<&str> {
        self.hops.last().map(Hop::arr_airport)
    }

    pub fn dep_time(&self) -> Option<NaiveDateTime> {
        self.hops.first().map(Hop::dep_time)
    }

    pub fn arr_time(&self) -> Option<NaiveDateTime> {
        self.hops.last().map(Hop::arr_time)
    }

    pub fn dep_time_utc(&self) -> Option<DateTime<Utc>> {
        self.hops.first().map(Hop::dep_time_utc)
    }

    pub fn arr_time_utc(&self) -> Option<DateTime<Utc>> {
        self.hops.last().map(Hop::arr_time_utc)
    }

    // First departure to last arrival, so layovers count.
    pub fn duration(&self) -> Option<TimeDelta> {
        match (self.dep_time_utc(), self.arr_time_utc()) {
            (Some(dep), Some(arr)) => Some(arr - dep),
            _ => None,
        }
    }
}

// A complete multi-flight itinerary. The score breakdown is attached exactly
// once per scoring pass; None means the scorer has not run yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Journey {
    flights: Vec<Flight>,
    score: Option<ScoreBreakdown>,
}

impl Journey {
    pub fn new(flights: Vec<Flight>) -> Self {
        Self {
            flights,
            score: None,
        }
    }

    pub fn flights(&self) -> &[Flight] {
        &self.flights
    }

    pub fn price(&self) -> f64 {
        self.flights.iter().map(Flight::price).sum()
    }

    pub fn duration(&self) -> Option<TimeDelta> {
        self.flights
            .iter()
            .try_fold(TimeDelta::zero(), |total, flight| {
                flight.duration().map(|d| total + d)
            })
    }

    pub fn score(&self) -> Option<&ScoreBreakdown> {
        self.score.as_ref()
    }

    pub(crate) fn set_score(&mut self, breakdown: ScoreBreakdown) {
        self.score = Some(breakdown);
    }
}

// The four cost components of a journey score, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub price: f64,
    pub departure_surcharge: f64,
    pub arrival_surcharge: f64,
    pub time_cost: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.price + self.departure_surcharge + self.arrival_surcharge + self.time_cost
    }

    pub fn components(&self) -> [(&'static str, f64); 4] {
        [
            ("price", self.price),
            ("departure surcharge", self.departure_surcharge),
            ("arrival surcharge", self.arrival_surcharge),
            ("time cost", self.time_cost),
        ]
    }
}

// Carrier id -> display name, loaded once per session from the airline
// directory endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AirlineDirectory {
    names: HashMap<String, String>,
}

impl AirlineDirectory {
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }

    pub fn name(&self, airline_id: &str) -> Option<&str> {
        self.names.get(airline_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
