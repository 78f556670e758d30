//! Named pattern rules for Google Flights offer labels.
//!
//! Each rule is a standalone regex over the accessibility-label text of a
//! result card, so a phrasing change in the source UI shows up as one
//! failing rule instead of a silently half-empty record. Matching is
//! case-sensitive; whitespace between tokens is flexible.

use std::sync::LazyLock;

use regex::Regex;

/// "From 1,234 CAD dollars" — amount with optional thousands separators.
pub static PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"From ([\d,]+)\s+(\w+)\s+dollars").unwrap());

/// "Nonstop" or "1 stop" / "2 stops". Group 1 is absent for nonstop.
pub static STOPS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s+stops?|Nonstop").unwrap());

/// "flight with Air Canada." — carrier name runs up to the period.
pub static AIRLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"flight with ([\w\s\-]+)\.").unwrap());

/// "Leaves YYZ at 10:00 AM on Mon, August 22" — airport, time, month-day.
/// The weekday is matched but not captured. Times may contain U+202F
/// (narrow no-break space) between the minutes and the AM/PM marker.
pub static DEPARTURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Leaves\s+(.+?)\s+at\s+([\d:\u{202F}\u{A0} APM]+)\s+on\s+\w+,\s+(\w+ \d+)")
        .unwrap()
});

/// "arrives at YYC at 12:30 PM on Mon, August 22" — same shape as
/// [`DEPARTURE`]; both "arrive" and "arrives" occur in the wild.
pub static ARRIVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"arrives?\s+at\s+(.+?)\s+at\s+([\d:\u{202F}\u{A0} APM]+)\s+on\s+\w+,\s+(\w+ \d+)")
        .unwrap()
});

/// "Total duration 2h 30min." — free text up to the first period.
/// The source has used two terminator conventions over time; this crate
/// standardizes on the period.
pub static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Total duration\s+(.+?)\.").unwrap());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_with_separator() {
        let caps = PRICE.captures("From 1,234 CAD dollars").unwrap();
        assert_eq!(&caps[1], "1,234");
        assert_eq!(&caps[2], "CAD");
    }

    #[test]
    fn price_is_case_sensitive() {
        assert!(PRICE.captures("from 1,234 CAD dollars").is_none());
    }

    #[test]
    fn stops_variants() {
        let caps = STOPS.captures("1 stop flight").unwrap();
        assert_eq!(caps.get(1).unwrap().as_str(), "1");
        let caps = STOPS.captures("2 stops flight").unwrap();
        assert_eq!(caps.get(1).unwrap().as_str(), "2");
        let caps = STOPS.captures("Nonstop flight").unwrap();
        assert!(caps.get(1).is_none());
    }

    #[test]
    fn airline_stops_at_period() {
        let caps = AIRLINE
            .captures("Nonstop flight with Air Canada. Leaves YYZ at 10:00 AM")
            .unwrap();
        assert_eq!(&caps[1], "Air Canada");
    }

    #[test]
    fn departure_captures_airport_time_date() {
        let caps = DEPARTURE
            .captures("Leaves YYZ at 10:00 AM on Mon, August 22 arrives")
            .unwrap();
        assert_eq!(&caps[1], "YYZ");
        assert_eq!(caps[2].trim(), "10:00 AM");
        assert_eq!(&caps[3], "August 22");
    }

    #[test]
    fn departure_accepts_narrow_nbsp_in_time() {
        let caps = DEPARTURE
            .captures("Leaves YYZ at 10:00\u{202F}AM on Mon, August 22")
            .unwrap();
        assert_eq!(&caps[2], "10:00\u{202F}AM");
    }

    #[test]
    fn arrival_accepts_both_verb_forms() {
        for text in [
            "arrive at YYC at 12:30 PM on Mon, August 22",
            "arrives at YYC at 12:30 PM on Mon, August 22",
        ] {
            let caps = ARRIVAL.captures(text).unwrap();
            assert_eq!(&caps[1], "YYC");
            assert_eq!(&caps[3], "August 22");
        }
    }

    #[test]
    fn duration_terminates_at_period() {
        let caps = DURATION
            .captures("Total duration 2h 30min. Select flight")
            .unwrap();
        assert_eq!(&caps[1], "2h 30min");
    }
}
