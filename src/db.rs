use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use tracing::warn;

use crate::config::SchemaMode;
use crate::parser::{FlightBatch, FlightRecord, LegRole};

const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(dir) = Path::new(path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS searches (
            id              INTEGER PRIMARY KEY,
            origin          TEXT NOT NULL,
            destination     TEXT NOT NULL,
            departure_date  TEXT NOT NULL,
            return_date     TEXT NOT NULL,
            departure_label TEXT,
            return_label    TEXT,
            error           TEXT,
            latency_ms      INTEGER,
            processed       BOOLEAN NOT NULL DEFAULT 0,
            scraped_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_searches_processed ON searches(processed);

        -- Narrow shape: two rows per trip, tagged by leg
        CREATE TABLE IF NOT EXISTS flights (
            id                TEXT NOT NULL,
            leg               TEXT NOT NULL CHECK(leg IN ('departure','return')),
            price             INTEGER NOT NULL,
            currency          TEXT NOT NULL,
            stops             INTEGER,
            airline           TEXT NOT NULL,
            departure_airport TEXT NOT NULL,
            departure_time    TEXT NOT NULL,
            departure_date    TEXT,
            arrival_airport   TEXT NOT NULL,
            arrival_time      TEXT NOT NULL,
            arrival_date      TEXT,
            duration          TEXT NOT NULL,
            created_at        TEXT NOT NULL,
            UNIQUE(id, leg)
        );
        CREATE INDEX IF NOT EXISTS idx_flights_route
            ON flights(departure_airport, arrival_airport);
        CREATE INDEX IF NOT EXISTS idx_flights_created ON flights(created_at);

        -- Wide shape: one row per trip, return leg in prefixed columns
        CREATE TABLE IF NOT EXISTS flights_wide (
            id                        TEXT PRIMARY KEY,
            price                     INTEGER NOT NULL,
            currency                  TEXT NOT NULL,
            stops                     INTEGER,
            airline                   TEXT NOT NULL,
            departure_airport         TEXT NOT NULL,
            departure_time            TEXT NOT NULL,
            departure_date            TEXT,
            arrival_airport           TEXT NOT NULL,
            arrival_time              TEXT NOT NULL,
            arrival_date              TEXT,
            duration                  TEXT NOT NULL,
            return_price              INTEGER NOT NULL,
            return_currency           TEXT NOT NULL,
            return_stops              INTEGER,
            return_airline            TEXT NOT NULL,
            return_departure_airport  TEXT NOT NULL,
            return_departure_time     TEXT NOT NULL,
            return_departure_date     TEXT,
            return_arrival_airport    TEXT NOT NULL,
            return_arrival_time       TEXT NOT NULL,
            return_arrival_date       TEXT,
            return_duration           TEXT NOT NULL,
            created_at                TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

// ── Scraping ──

/// Result of driving one route search, label text or error.
pub struct ScrapeRow {
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    pub return_date: String,
    pub departure_label: Option<String>,
    pub return_label: Option<String>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

pub fn insert_search(conn: &Connection, row: &ScrapeRow) -> Result<i64> {
    conn.execute(
        "INSERT INTO searches
         (origin, destination, departure_date, return_date,
          departure_label, return_label, error, latency_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            row.origin,
            row.destination,
            row.departure_date,
            row.return_date,
            row.departure_label,
            row.return_label,
            row.error,
            row.latency_ms,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

// ── Processing ──

/// A stored search whose labels are present and not yet parsed.
pub struct Search {
    pub id: i64,
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    pub return_date: String,
    pub departure_label: String,
    pub return_label: String,
}

impl Search {
    /// The labels carry "Month Day" with no year; the search's departure
    /// date supplies it.
    pub fn flight_year(&self) -> Option<i32> {
        NaiveDate::parse_from_str(&self.departure_date, "%Y-%m-%d")
            .ok()
            .map(|d| d.year())
    }
}

pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<Search>> {
    let sql = format!(
        "SELECT id, origin, destination, departure_date, return_date,
                departure_label, return_label
         FROM searches
         WHERE processed = 0
           AND departure_label IS NOT NULL
           AND return_label IS NOT NULL
         ORDER BY id{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Search {
                id: row.get(0)?,
                origin: row.get(1)?,
                destination: row.get(2)?,
                departure_date: row.get(3)?,
                return_date: row.get(4)?,
                departure_label: row.get(5)?,
                return_label: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn mark_processed(conn: &Connection, ids: &[i64]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare("UPDATE searches SET processed = 1 WHERE id = ?1")?;
        for id in ids {
            stmt.execute(rusqlite::params![id])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Flight records ──

/// Write a batch under the configured schema mode. Returns the number
/// of rows written. All rows carry the batch's single timestamp.
pub fn save_batch(conn: &Connection, batch: &FlightBatch, mode: SchemaMode) -> Result<usize> {
    match mode {
        SchemaMode::Narrow => save_narrow(conn, batch),
        SchemaMode::Wide => save_wide(conn, batch),
    }
}

/// The store predates this crate and represents missing text fields as
/// the literal string 'None'. Applied only here, at the serialization
/// boundary; in-memory records keep a real Option.
fn text_or_none(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "None".into())
}

fn save_narrow(conn: &Connection, batch: &FlightBatch) -> Result<usize> {
    let created_at = batch.created_at.format(TIMESTAMP_FMT).to_string();
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO flights
             (id, leg, price, currency, stops, airline,
              departure_airport, departure_time, departure_date,
              arrival_airport, arrival_time, arrival_date,
              duration, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
        )?;
        for r in &batch.records {
            count += stmt.execute(rusqlite::params![
                r.trip_id,
                r.role.as_str(),
                r.price,
                text_or_none(&r.currency),
                r.stops,
                text_or_none(&r.airline),
                text_or_none(&r.departure_airport),
                text_or_none(&r.departure_time),
                r.departure_date.map(|d| d.to_string()),
                text_or_none(&r.arrival_airport),
                text_or_none(&r.arrival_time),
                r.arrival_date.map(|d| d.to_string()),
                text_or_none(&r.duration),
                created_at,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

fn save_wide(conn: &Connection, batch: &FlightBatch) -> Result<usize> {
    // Re-pair legs by trip id, preserving record order
    let mut order: Vec<&str> = Vec::new();
    let mut trips: HashMap<&str, (Option<&FlightRecord>, Option<&FlightRecord>)> =
        HashMap::new();
    for r in &batch.records {
        let entry = trips.entry(r.trip_id.as_str()).or_insert_with(|| {
            order.push(r.trip_id.as_str());
            (None, None)
        });
        match r.role {
            LegRole::Departure => entry.0 = Some(r),
            LegRole::Return => entry.1 = Some(r),
        }
    }

    let created_at = batch.created_at.format(TIMESTAMP_FMT).to_string();
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO flights_wide
             (id, price, currency, stops, airline,
              departure_airport, departure_time, departure_date,
              arrival_airport, arrival_time, arrival_date, duration,
              return_price, return_currency, return_stops, return_airline,
              return_departure_airport, return_departure_time, return_departure_date,
              return_arrival_airport, return_arrival_time, return_arrival_date,
              return_duration, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,
                     ?13,?14,?15,?16,?17,?18,?19,?20,?21,?22,?23,?24)",
        )?;
        for id in order {
            let (dep, ret) = trips[id];
            let (Some(dep), Some(ret)) = (dep, ret) else {
                warn!("trip {} is missing a leg, skipping wide row", id);
                continue;
            };
            count += stmt.execute(rusqlite::params![
                dep.trip_id,
                dep.price,
                text_or_none(&dep.currency),
                dep.stops,
                text_or_none(&dep.airline),
                text_or_none(&dep.departure_airport),
                text_or_none(&dep.departure_time),
                dep.departure_date.map(|d| d.to_string()),
                text_or_none(&dep.arrival_airport),
                text_or_none(&dep.arrival_time),
                dep.arrival_date.map(|d| d.to_string()),
                text_or_none(&dep.duration),
                ret.price,
                text_or_none(&ret.currency),
                ret.stops,
                text_or_none(&ret.airline),
                text_or_none(&ret.departure_airport),
                text_or_none(&ret.departure_time),
                ret.departure_date.map(|d| d.to_string()),
                text_or_none(&ret.arrival_airport),
                text_or_none(&ret.arrival_time),
                ret.arrival_date.map(|d| d.to_string()),
                text_or_none(&ret.duration),
                created_at,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── History ──

pub struct HistoryRow {
    pub trip_id: String,
    pub leg: String,
    pub price: i64,
    pub currency: String,
    pub stops: Option<i64>,
    pub airline: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_date: Option<String>,
    pub created_at: String,
}

pub fn fetch_history(
    conn: &Connection,
    origin: Option<&str>,
    destination: Option<&str>,
    limit: usize,
) -> Result<Vec<HistoryRow>> {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(o) = origin {
        conditions.push(format!("departure_airport = ?{}", params.len() + 1));
        params.push(Box::new(o.to_string()));
    }
    if let Some(d) = destination {
        conditions.push(format!("arrival_airport = ?{}", params.len() + 1));
        params.push(Box::new(d.to_string()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT id, leg, price, currency, stops, airline,
                departure_airport, arrival_airport, departure_date, created_at
         FROM flights{}
         ORDER BY created_at DESC, id, leg
         LIMIT {}",
        where_clause, limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(HistoryRow {
                trip_id: row.get(0)?,
                leg: row.get(1)?,
                price: row.get(2)?,
                currency: row.get(3)?,
                stops: row.get(4)?,
                airline: row.get(5)?,
                departure_airport: row.get(6)?,
                arrival_airport: row.get(7)?,
                departure_date: row.get(8)?,
                created_at: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub searches: usize,
    pub scrape_errors: usize,
    pub unprocessed: usize,
    pub flight_rows: usize,
    pub wide_rows: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let searches: usize = conn.query_row("SELECT COUNT(*) FROM searches", [], |r| r.get(0))?;
    let scrape_errors: usize = conn.query_row(
        "SELECT COUNT(*) FROM searches WHERE error IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let unprocessed: usize = conn.query_row(
        "SELECT COUNT(*) FROM searches
         WHERE processed = 0 AND departure_label IS NOT NULL AND return_label IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let flight_rows: usize =
        conn.query_row("SELECT COUNT(*) FROM flights", [], |r| r.get(0))?;
    let wide_rows: usize =
        conn.query_row("SELECT COUNT(*) FROM flights_wide", [], |r| r.get(0))?;
    Ok(Stats {
        searches,
        scrape_errors,
        unprocessed,
        flight_rows,
        wide_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{assemble, compose, RouteTrip};

    const LABEL: &str = "From 1,234 CAD dollars Nonstop flight with Air Canada. \
        Leaves YYZ at 10:00 AM on Mon, August 22 arrives at YYC at 12:30 PM \
        on Mon, August 22. Total duration 2h 30min.";

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn one_trip_batch() -> FlightBatch {
        let (departure, returning) = compose(LABEL, LABEL);
        assemble(vec![RouteTrip {
            departure,
            returning,
            flight_year: 2025,
        }])
    }

    #[test]
    fn narrow_save_writes_two_rows_per_trip() {
        let conn = memory_db();
        let batch = one_trip_batch();
        let written = save_batch(&conn, &batch, SchemaMode::Narrow).unwrap();
        assert_eq!(written, 2);

        let rows = fetch_history(&conn, Some("YYZ"), Some("YYC"), 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].price, 1234);
        assert_eq!(rows[0].departure_date.as_deref(), Some("2025-08-22"));
        assert_eq!(rows[0].created_at, rows[1].created_at);
    }

    #[test]
    fn wide_save_writes_one_row_per_trip() {
        let conn = memory_db();
        let batch = one_trip_batch();
        let written = save_batch(&conn, &batch, SchemaMode::Wide).unwrap();
        assert_eq!(written, 1);

        let return_price: i64 = conn
            .query_row("SELECT return_price FROM flights_wide", [], |r| r.get(0))
            .unwrap();
        assert_eq!(return_price, 1234);
    }

    #[test]
    fn missing_text_fields_serialize_as_none_string() {
        let conn = memory_db();
        let (departure, returning) =
            compose("From 500 CAD dollars and nothing else useful", LABEL);
        let batch = assemble(vec![RouteTrip {
            departure,
            returning,
            flight_year: 2025,
        }]);
        save_batch(&conn, &batch, SchemaMode::Narrow).unwrap();

        let (airline, date): (String, Option<String>) = conn
            .query_row(
                "SELECT airline, departure_date FROM flights WHERE leg = 'departure'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(airline, "None");
        assert_eq!(date, None);
    }

    #[test]
    fn wide_save_skips_half_trips() {
        let conn = memory_db();
        let (departure, returning) = compose(LABEL, "no price in this label");
        let batch = assemble(vec![RouteTrip {
            departure,
            returning,
            flight_year: 2025,
        }]);
        assert_eq!(batch.failures.len(), 1);
        let written = save_batch(&conn, &batch, SchemaMode::Wide).unwrap();
        assert_eq!(written, 0);
    }
}
