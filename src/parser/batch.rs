//! Batch assembly: normalize every route's leg pair into one ordered,
//! uniformly timestamped collection.

use chrono::{DateTime, Utc};
use tracing::warn;

use super::compose::TripLeg;
use super::normalize::{normalize, FlightRecord, RecordError};

/// One composed round trip plus the year its labels omit.
#[derive(Debug, Clone)]
pub struct RouteTrip {
    pub departure: TripLeg,
    pub returning: TripLeg,
    pub flight_year: i32,
}

/// The output of one run: records in route-input order (departure then
/// return per trip), rejected legs alongside, and a single creation
/// timestamp shared by every record.
#[derive(Debug)]
pub struct FlightBatch {
    pub created_at: DateTime<Utc>,
    pub records: Vec<FlightRecord>,
    pub failures: Vec<RecordError>,
}

/// Normalize all trips into a [`FlightBatch`]. The timestamp is captured
/// once at assembly start so records from the same run are
/// indistinguishable by creation time. One bad leg never aborts the
/// batch; it lands in `failures` and assembly continues.
pub fn assemble(trips: Vec<RouteTrip>) -> FlightBatch {
    let created_at = Utc::now();
    let mut records = Vec::with_capacity(trips.len() * 2);
    let mut failures = Vec::new();

    for trip in trips {
        for leg in [trip.departure, trip.returning] {
            match normalize(leg, trip.flight_year) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!("dropping leg: {err}");
                    failures.push(err);
                }
            }
        }
    }

    FlightBatch {
        created_at,
        records,
        failures,
    }
}
