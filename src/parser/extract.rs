//! Segment extraction: one offer label → one typed field set.

use crate::parser::patterns;

/// Fields recovered from a single flight-leg label.
///
/// Every field is independently optional: a rule that fails to match
/// leaves its field `None` and never blocks the other rules. Raw dates
/// are "Month Day" strings with no year; the year comes from the search
/// context at normalization time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedLeg {
    pub price: Option<i64>,
    pub currency: Option<String>,
    pub stops: Option<i64>,
    pub airline: Option<String>,
    pub departure_airport: Option<String>,
    pub departure_time: Option<String>,
    pub departure_date_raw: Option<String>,
    pub arrival_airport: Option<String>,
    pub arrival_time: Option<String>,
    pub arrival_date_raw: Option<String>,
    pub duration: Option<String>,
}

/// Run all pattern rules against one offer label. Total over any input;
/// malformed text yields an all-`None` leg, never an error.
pub fn extract(text: &str) -> ExtractedLeg {
    let mut leg = ExtractedLeg::default();

    if let Some(caps) = patterns::PRICE.captures(text) {
        leg.price = caps[1].replace(',', "").parse().ok();
        leg.currency = Some(caps[2].to_string());
    }

    if let Some(caps) = patterns::STOPS.captures(text) {
        leg.stops = match caps.get(1) {
            Some(n) => n.as_str().parse().ok(),
            // "Nonstop" matched with no digit group
            None => Some(0),
        };
    }

    if let Some(caps) = patterns::AIRLINE.captures(text) {
        leg.airline = Some(caps[1].trim().to_string());
    }

    if let Some(caps) = patterns::DEPARTURE.captures(text) {
        leg.departure_airport = Some(caps[1].trim().to_string());
        leg.departure_time = Some(clean_time(&caps[2]));
        leg.departure_date_raw = Some(caps[3].trim().to_string());
    }

    if let Some(caps) = patterns::ARRIVAL.captures(text) {
        leg.arrival_airport = Some(caps[1].trim().to_string());
        leg.arrival_time = Some(clean_time(&caps[2]));
        leg.arrival_date_raw = Some(caps[3].trim().to_string());
    }

    if let Some(caps) = patterns::DURATION.captures(text) {
        leg.duration = Some(caps[1].trim().to_string());
    }

    leg
}

/// Times arrive with U+202F / U+A0 between minutes and the AM/PM marker.
fn clean_time(raw: &str) -> String {
    raw.replace(['\u{202F}', '\u{A0}'], " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "From 1,234 CAD dollars Nonstop flight with Air Canada. \
        Leaves YYZ at 10:00 AM on Mon, August 22 arrives at YYC at 12:30 PM \
        on Mon, August 22. Total duration 2h 30min.";

    #[test]
    fn full_label_recovers_every_field() {
        let leg = extract(FULL);
        assert_eq!(leg.price, Some(1234));
        assert_eq!(leg.currency.as_deref(), Some("CAD"));
        assert_eq!(leg.stops, Some(0));
        assert_eq!(leg.airline.as_deref(), Some("Air Canada"));
        assert_eq!(leg.departure_airport.as_deref(), Some("YYZ"));
        assert_eq!(leg.departure_time.as_deref(), Some("10:00 AM"));
        assert_eq!(leg.departure_date_raw.as_deref(), Some("August 22"));
        assert_eq!(leg.arrival_airport.as_deref(), Some("YYC"));
        assert_eq!(leg.arrival_time.as_deref(), Some("12:30 PM"));
        assert_eq!(leg.arrival_date_raw.as_deref(), Some("August 22"));
        assert_eq!(leg.duration.as_deref(), Some("2h 30min"));
    }

    #[test]
    fn one_stop_parses_count() {
        let leg = extract("From 890 CAD dollars 1 stop flight with WestJet.");
        assert_eq!(leg.stops, Some(1));
        assert_eq!(leg.airline.as_deref(), Some("WestJet"));
    }

    #[test]
    fn missing_stops_leaves_other_fields_intact() {
        let text = FULL.replace("Nonstop ", "");
        let leg = extract(&text);
        assert_eq!(leg.stops, None);
        assert_eq!(leg.price, Some(1234));
        assert_eq!(leg.airline.as_deref(), Some("Air Canada"));
        assert_eq!(leg.duration.as_deref(), Some("2h 30min"));
    }

    #[test]
    fn narrow_nbsp_in_times_is_normalized() {
        let leg = extract(
            "Leaves YYZ at 10:00\u{202F}AM on Mon, August 22 \
             arrives at NRT at 2:15\u{202F}PM on Tue, August 23.",
        );
        assert_eq!(leg.departure_time.as_deref(), Some("10:00 AM"));
        assert_eq!(leg.arrival_time.as_deref(), Some("2:15 PM"));
        assert_eq!(leg.arrival_date_raw.as_deref(), Some("August 23"));
    }

    #[test]
    fn hyphenated_airline() {
        let leg = extract("Nonstop flight with Air France-KLM.");
        assert_eq!(leg.airline.as_deref(), Some("Air France-KLM"));
    }

    #[test]
    fn garbage_input_yields_empty_leg() {
        assert_eq!(extract("complete nonsense"), ExtractedLeg::default());
        assert_eq!(extract(""), ExtractedLeg::default());
    }
}
