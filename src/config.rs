use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

/// Which table shape `save_batch` writes. Two shapes exist in the store's
/// history: two rows per trip with a `leg` column, or one wide row per
/// trip with a `return_`-prefixed column group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMode {
    Narrow,
    Wide,
}

/// One configured route: a fixed origin/destination pair queried on
/// given dates. Loaded from the routes JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteSpec {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
}

/// Everything the orchestrator needs, resolved once at startup. The
/// pipeline itself takes no global state.
#[derive(Debug, Clone)]
pub struct Config {
    pub webdriver_url: String,
    pub headless: bool,
    pub db_path: String,
    pub schema_mode: SchemaMode,
    pub routes: Vec<RouteSpec>,
}

impl Config {
    /// Env vars for the plumbing, JSON file for the route list.
    ///
    /// - `WEBDRIVER_URL` (default `http://localhost:9515`)
    /// - `FLIGHTS_DB` (default `data/flights.sqlite`)
    /// - `FLIGHTS_SCHEMA_MODE` (`narrow` | `wide`, default `narrow`)
    /// - `FLIGHTS_HEADED` — set to run the browser with a visible window
    pub fn load(routes_path: &str) -> Result<Self> {
        let webdriver_url = std::env::var("WEBDRIVER_URL")
            .unwrap_or_else(|_| "http://localhost:9515".into());
        let db_path =
            std::env::var("FLIGHTS_DB").unwrap_or_else(|_| "data/flights.sqlite".into());
        let headless = std::env::var("FLIGHTS_HEADED").is_err();
        let schema_mode = match std::env::var("FLIGHTS_SCHEMA_MODE").as_deref() {
            Ok("wide") => SchemaMode::Wide,
            _ => SchemaMode::Narrow,
        };
        let routes = load_routes(routes_path)?;

        Ok(Config {
            webdriver_url,
            headless,
            db_path,
            schema_mode,
            routes,
        })
    }
}

fn load_routes(path: &str) -> Result<Vec<RouteSpec>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read routes file {path}"))?;
    let routes: Vec<RouteSpec> =
        serde_json::from_str(&raw).with_context(|| format!("Invalid routes file {path}"))?;
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_json_deserializes() {
        let routes: Vec<RouteSpec> = serde_json::from_str(
            r#"[{
                "origin": "YYZ",
                "destination": "YYC",
                "departure_date": "2025-08-22",
                "return_date": "2025-08-26"
            }]"#,
        )
        .unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].origin, "YYZ");
        assert_eq!(routes[0].departure_date.to_string(), "2025-08-22");
    }
}
