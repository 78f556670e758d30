pub mod batch;
pub mod compose;
pub mod extract;
pub mod normalize;
pub mod patterns;

use anyhow::{Context, Result};

use crate::db::Search;
pub use batch::{assemble, FlightBatch, RouteTrip};
pub use compose::{compose, LegRole, TripLeg};
pub use extract::{extract, ExtractedLeg};
pub use normalize::{normalize, FlightRecord, RecordError};

/// Pipeline for one stored search: raw offer labels → extracted legs
/// bound under a fresh trip id. The flight year comes from the search's
/// departure date, since the labels themselves omit it.
pub fn process_search(search: &Search) -> Result<RouteTrip> {
    let flight_year = search.flight_year().with_context(|| {
        format!(
            "search {} ({} -> {}, {} / {}): departure date yields no flight year",
            search.id,
            search.origin,
            search.destination,
            search.departure_date,
            search.return_date
        )
    })?;
    let (departure, returning) = compose(&search.departure_label, &search.return_label);
    Ok(RouteTrip {
        departure,
        returning,
        flight_year,
    })
}
