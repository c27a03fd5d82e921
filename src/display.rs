// Pure string formatting for itineraries; the CLI layer does the printing.
// Everything touching a derived attribute returns Option so zero-hop flights
// surface as "nothing to show" instead of a bogus line.

use chrono::TimeDelta;

use crate::itinerary::{AirlineDirectory, Hop, Journey, ScoreBreakdown};

pub fn format_duration(duration: TimeDelta) -> String {
    let secs = duration.num_seconds();
    format!("{:2}h{:02}", secs / 3600, secs / 60 % 60)
}

// "HEL-SYD,SYD-HEL" for a two-flight round trip.
fn flights_short(journey: &Journey) -> Option<String> {
    journey
        .flights()
        .iter()
        .map(|flight| {
            Some(format!(
                "{}-{}",
                flight.dep_airport()?,
                flight.arr_airport()?
            ))
        })
        .collect::<Option<Vec<_>>>()
        .map(|parts| parts.join(","))
}

pub fn journey_headline(journey: &Journey) -> Option<String> {
    let short = flights_short(journey)?;
    let duration = journey.duration()?;
    Some(format!(
        "{}  {:.0}€  {}",
        short,
        journey.price(),
        format_duration(duration)
    ))
}

// "S: 170 = 100 + 20 + 20 + 30", components in breakdown order.
pub fn score_line(breakdown: &ScoreBreakdown) -> String {
    let parts: Vec<String> = breakdown
        .components()
        .iter()
        .map(|(_, value)| format!("{value:.0}"))
        .collect();
    format!("S: {:.0} = {}", breakdown.total(), parts.join(" + "))
}

// One row of the ranked summary table; None until the journey is scored.
pub fn summary_line(journey: &Journey) -> Option<String> {
    let breakdown = journey.score()?;
    let short = flights_short(journey)?;
    let duration = journey.duration()?;
    Some(format!(
        "S: {:.0}  |  {:4.0} €  |  {}  |  {}",
        breakdown.total(),
        journey.price(),
        format_duration(duration),
        short
    ))
}

pub fn hop_line(hop: &Hop, airlines: &AirlineDirectory) -> String {
    let airline = airlines.name(hop.airline()).unwrap_or_else(|| hop.airline());
    format!(
        "{}  {} - {}  {}  - {} {}",
        hop.dep_time().format("%Y-%m-%d %H:%M:%S"),
        hop.dep_airport(),
        hop.arr_airport(),
        hop.arr_time().format("%Y-%m-%d %H:%M:%S"),
        format_duration(hop.duration()),
        airline
    )
}
