//! Normalization: resolve dates against the flight year and enforce the
//! fields the store requires.

use chrono::NaiveDate;
use thiserror::Error;

use super::compose::{LegRole, TripLeg};

/// A leg the normalizer rejected. The batch keeps assembling past these;
/// the caller decides whether a partial batch is still worth persisting.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The downstream store mandates a non-null price.
    #[error("{role} leg of trip {trip_id} has no parseable price")]
    MissingPrice { trip_id: String, role: LegRole },
}

/// A leg ready for persistence. Textual fields stay `Option` in memory;
/// the `"None"` stand-in the store expects is applied at the db boundary.
#[derive(Debug, Clone)]
pub struct FlightRecord {
    pub trip_id: String,
    pub role: LegRole,
    pub price: i64,
    pub currency: Option<String>,
    pub stops: Option<i64>,
    pub airline: Option<String>,
    pub departure_airport: Option<String>,
    pub departure_time: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub arrival_airport: Option<String>,
    pub arrival_time: Option<String>,
    pub arrival_date: Option<NaiveDate>,
    pub duration: Option<String>,
}

/// Coerce one extracted leg into a [`FlightRecord`].
///
/// Date resolution is all-or-nothing per leg: if either raw date is
/// absent or fails to parse as "Month Day" + year, both dates come out
/// `None` rather than leaving one half guessed.
pub fn normalize(leg: TripLeg, flight_year: i32) -> Result<FlightRecord, RecordError> {
    let TripLeg { trip_id, role, leg } = leg;

    let price = leg.price.ok_or_else(|| RecordError::MissingPrice {
        trip_id: trip_id.clone(),
        role,
    })?;

    let (departure_date, arrival_date) = resolve_dates(
        leg.departure_date_raw.as_deref(),
        leg.arrival_date_raw.as_deref(),
        flight_year,
    );

    Ok(FlightRecord {
        trip_id,
        role,
        price,
        currency: leg.currency,
        stops: leg.stops,
        airline: leg.airline,
        departure_airport: leg.departure_airport,
        departure_time: leg.departure_time,
        departure_date,
        arrival_airport: leg.arrival_airport,
        arrival_time: leg.arrival_time,
        arrival_date,
        duration: leg.duration,
    })
}

fn resolve_dates(
    departure_raw: Option<&str>,
    arrival_raw: Option<&str>,
    flight_year: i32,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    match (
        departure_raw.and_then(|raw| parse_month_day(raw, flight_year)),
        arrival_raw.and_then(|raw| parse_month_day(raw, flight_year)),
    ) {
        (Some(dep), Some(arr)) => (Some(dep), Some(arr)),
        _ => (None, None),
    }
}

/// "August 22" + 2025 → 2025-08-22.
fn parse_month_day(raw: &str, year: i32) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{raw} {year}"), "%B %d %Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract::ExtractedLeg;

    fn leg_with(extracted: ExtractedLeg) -> TripLeg {
        TripLeg {
            trip_id: "test-trip".into(),
            role: LegRole::Departure,
            leg: extracted,
        }
    }

    #[test]
    fn dates_resolve_against_flight_year() {
        let record = normalize(
            leg_with(ExtractedLeg {
                price: Some(1234),
                departure_date_raw: Some("August 22".into()),
                arrival_date_raw: Some("August 23".into()),
                ..Default::default()
            }),
            2025,
        )
        .unwrap();
        assert_eq!(
            record.departure_date,
            NaiveDate::from_ymd_opt(2025, 8, 22)
        );
        assert_eq!(record.arrival_date, NaiveDate::from_ymd_opt(2025, 8, 23));
    }

    #[test]
    fn invalid_date_nulls_both_dates() {
        let record = normalize(
            leg_with(ExtractedLeg {
                price: Some(100),
                departure_date_raw: Some("Smarch 99".into()),
                arrival_date_raw: Some("August 23".into()),
                ..Default::default()
            }),
            2025,
        )
        .unwrap();
        assert_eq!(record.departure_date, None);
        assert_eq!(record.arrival_date, None);
    }

    #[test]
    fn absent_date_nulls_both_dates() {
        let record = normalize(
            leg_with(ExtractedLeg {
                price: Some(100),
                departure_date_raw: Some("August 22".into()),
                arrival_date_raw: None,
                ..Default::default()
            }),
            2025,
        )
        .unwrap();
        assert_eq!(record.departure_date, None);
        assert_eq!(record.arrival_date, None);
    }

    #[test]
    fn missing_price_is_a_typed_failure() {
        let err = normalize(leg_with(ExtractedLeg::default()), 2025).unwrap_err();
        match err {
            RecordError::MissingPrice { trip_id, role } => {
                assert_eq!(trip_id, "test-trip");
                assert_eq!(role, LegRole::Departure);
            }
        }
    }

    #[test]
    fn textual_fields_stay_optional_in_memory() {
        let record = normalize(
            leg_with(ExtractedLeg {
                price: Some(100),
                ..Default::default()
            }),
            2025,
        )
        .unwrap();
        assert_eq!(record.currency, None);
        assert_eq!(record.airline, None);
        assert_eq!(record.duration, None);
    }
}
