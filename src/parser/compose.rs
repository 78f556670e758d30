//! Leg composition: bind a departure and a return label under one trip id.

use std::fmt;

use uuid::Uuid;

use super::extract::{extract, ExtractedLeg};

/// Which direction of the round trip a leg describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegRole {
    Departure,
    Return,
}

impl LegRole {
    pub fn as_str(self) -> &'static str {
        match self {
            LegRole::Departure => "departure",
            LegRole::Return => "return",
        }
    }
}

impl fmt::Display for LegRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An extracted leg tagged with its trip id and role. Exactly one
/// departure and one return leg share a given id.
#[derive(Debug, Clone)]
pub struct TripLeg {
    pub trip_id: String,
    pub role: LegRole,
    pub leg: ExtractedLeg,
}

/// Extract both labels of a round trip and tag them with a fresh shared
/// trip id. Dates stay raw here; year resolution is the normalizer's job.
pub fn compose(departure_text: &str, return_text: &str) -> (TripLeg, TripLeg) {
    let trip_id = Uuid::new_v4().to_string();
    let departure = TripLeg {
        trip_id: trip_id.clone(),
        role: LegRole::Departure,
        leg: extract(departure_text),
    };
    let returning = TripLeg {
        trip_id,
        role: LegRole::Return,
        leg: extract(return_text),
    };
    (departure, returning)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legs_share_one_trip_id_with_complementary_roles() {
        let (dep, ret) = compose(
            "From 500 CAD dollars Nonstop flight with Porter.",
            "From 480 CAD dollars 1 stop flight with Porter.",
        );
        assert_eq!(dep.trip_id, ret.trip_id);
        assert_eq!(dep.role, LegRole::Departure);
        assert_eq!(ret.role, LegRole::Return);
        assert_eq!(dep.leg.price, Some(500));
        assert_eq!(ret.leg.stops, Some(1));
    }

    #[test]
    fn separate_calls_get_distinct_trip_ids() {
        let (a, _) = compose("", "");
        let (b, _) = compose("", "");
        assert_ne!(a.trip_id, b.trip_id);
    }
}
