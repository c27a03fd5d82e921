// Weighted cost score and ranking for normalized journeys. Lower is better:
// the score is money spent plus money-equivalents for hassle and time.

use std::collections::HashMap;

use thiserror::Error;

use crate::itinerary::{Journey, ScoreBreakdown};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("journey has no flights")]
    EmptyJourney,

    #[error("journey contains a flight with no hops")]
    EmptyFlight,
}

// Estimated cost of getting to or from an airport: ground transport, food,
// and a number of buffer hours spent waiting around.
#[derive(Debug, Clone, PartialEq)]
pub struct AirportCost {
    pub ground_transport: f64,
    pub food: f64,
    pub buffer_hours: f64,
}

pub struct Scorer {
    hourly_cost: f64,
    airport_costs: HashMap<String, AirportCost>,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(
            15.0,
            HashMap::from([
                (
                    // Boat crossing plus local transport.
                    "HEL".to_string(),
                    AirportCost {
                        ground_transport: 40.0,
                        food: 10.0,
                        buffer_hours: 4.0,
                    },
                ),
                (
                    // Bus plus local transport.
                    "RIX".to_string(),
                    AirportCost {
                        ground_transport: 30.0,
                        food: 5.0,
                        buffer_hours: 5.0,
                    },
                ),
            ]),
        )
    }
}

impl Scorer {
    pub fn new(hourly_cost: f64, airport_costs: HashMap<String, AirportCost>) -> Self {
        Self {
            hourly_cost,
            airport_costs,
        }
    }

    // Buffer hours are charged at double the in-flight hourly cost. Airports
    // not in the table contribute nothing.
    pub fn airport_surcharge(&self, airport: &str) -> f64 {
        self.airport_costs
            .get(airport)
            .map(|cost| cost.ground_transport + cost.food + cost.buffer_hours * 2.0 * self.hourly_cost)
            .unwrap_or(0.0)
    }

    // Computes the four components, attaches them as the journey's breakdown
    // (overwriting any previous pass) and returns the total.
    pub fn score(&self, journey: &mut Journey) -> Result<f64, ScoreError> {
        let flights = journey.flights();
        let first = flights.first().ok_or(ScoreError::EmptyJourney)?;
        let last = flights.last().ok_or(ScoreError::EmptyJourney)?;

        let departure_surcharge =
            self.airport_surcharge(first.dep_airport().ok_or(ScoreError::EmptyFlight)?);
        let arrival_surcharge =
            self.airport_surcharge(last.arr_airport().ok_or(ScoreError::EmptyFlight)?);
        let duration = journey.duration().ok_or(ScoreError::EmptyFlight)?;

        let breakdown = ScoreBreakdown {
            price: journey.price(),
            departure_surcharge,
            arrival_surcharge,
            time_cost: duration.num_seconds() as f64 / 3600.0 * self.hourly_cost,
        };
        let total = breakdown.total();
        journey.set_score(breakdown);
        Ok(total)
    }

    // Scores every journey, then stable-sorts ascending by total, so equal
    // scores keep their original relative order.
    pub fn rank(&self, journeys: &mut [Journey]) -> Result<(), ScoreError> {
        for journey in journeys.iter_mut() {
            self.score(journey)?;
        }
        journeys.sort_by(|a, b| {
            let a = a.score().map(ScoreBreakdown::total);
            let b = b.score().map(ScoreBreakdown::total);
            a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(())
    }
}
