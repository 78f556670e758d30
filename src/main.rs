mod config;
mod db;
mod driver;
mod parser;
mod webdriver;

use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;

use config::Config;

#[derive(Parser)]
#[command(name = "flight_tracker", about = "Round-trip flight price tracker")]
struct Cli {
    /// Routes file: JSON list of {origin, destination, departure_date, return_date}
    #[arg(long, default_value = "routes.json")]
    routes: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Search each configured route and store the raw offer labels
    Scrape {
        /// Max routes to search (default: all configured)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Parse stored labels into flight records
    Process {
        /// Max searches to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Scrape + process in one pipeline
    Run {
        /// Max routes to scrape+process
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Price history table
    History {
        /// Filter by departure airport (e.g. YYZ)
        #[arg(short, long)]
        origin: Option<String>,
        /// Filter by arrival airport (e.g. NRT)
        #[arg(short, long)]
        destination: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show scraping statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let cfg = Config::load(&cli.routes)?;

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            println!(
                "Schema ready at {} ({} routes configured)",
                cfg.db_path,
                cfg.routes.len()
            );
            Ok(())
        }
        Commands::Scrape { limit } => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let routes = limited_routes(&cfg, limit);
            println!("Scraping {} routes...", routes.len());
            let stats = driver::scrape_routes(&conn, &cfg, routes).await?;
            println!(
                "Done: {} searched ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Process { limit } => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let searches = db::fetch_unprocessed(&conn, limit)?;
            if searches.is_empty() {
                println!("No unprocessed searches. Run 'scrape' first.");
                return Ok(());
            }
            println!("Processing {} searches...", searches.len());
            let counts = process_searches(&conn, &cfg, &searches)?;
            counts.print();
            Ok(())
        }
        Commands::Run { limit } => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let routes = limited_routes(&cfg, limit);

            // Phase 1: scrape
            let t_scrape = Instant::now();
            println!("Pipeline: scraping {} routes...", routes.len());
            let stats = driver::scrape_routes(&conn, &cfg, routes).await?;
            println!(
                "Searched {} routes ({} ok, {} errors) in {:.1}s",
                stats.total,
                stats.ok,
                stats.errors,
                t_scrape.elapsed().as_secs_f64()
            );

            // Phase 2: process
            let searches = db::fetch_unprocessed(&conn, None)?;
            if searches.is_empty() {
                println!("Nothing to process (all searches had errors).");
                return Ok(());
            }
            println!("Processing {} searches...", searches.len());
            let counts = process_searches(&conn, &cfg, &searches)?;
            counts.print();
            Ok(())
        }
        Commands::History {
            origin,
            destination,
            limit,
        } => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let rows =
                db::fetch_history(&conn, origin.as_deref(), destination.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No flight records found.");
                return Ok(());
            }

            println!(
                "{:<10} | {:>6} | {:>4} | {:>5} | {:<20} | {:<5} | {:<5} | {:<10} | {:<19}",
                "Leg", "Price", "Cur", "Stops", "Airline", "From", "To", "Date", "Recorded"
            );
            println!("{}", "-".repeat(102));
            for r in &rows {
                let stops = r.stops.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
                let date = r.departure_date.as_deref().unwrap_or("unknown");
                println!(
                    "{:<10} | {:>6} | {:>4} | {:>5} | {:<20} | {:<5} | {:<5} | {:<10} | {:<19}",
                    r.leg,
                    r.price,
                    r.currency,
                    stops,
                    truncate(&r.airline, 20),
                    r.departure_airport,
                    r.arrival_airport,
                    date,
                    r.created_at,
                );
            }
            println!("\n{} rows", rows.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Searches:    {}", s.searches);
            println!("Errors:      {}", s.scrape_errors);
            println!("Unprocessed: {}", s.unprocessed);
            println!("Leg rows:    {}", s.flight_rows);
            println!("Trip rows:   {}", s.wide_rows);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn limited_routes(cfg: &Config, limit: Option<usize>) -> &[config::RouteSpec] {
    match limit {
        Some(n) => &cfg.routes[..n.min(cfg.routes.len())],
        None => &cfg.routes,
    }
}

struct ProcessCounts {
    searches: usize,
    records: usize,
    saved: usize,
    failures: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Parsed {} searches into {} records ({} rows saved, {} legs rejected).",
            self.searches, self.records, self.saved, self.failures,
        );
    }
}

fn process_searches(
    conn: &rusqlite::Connection,
    cfg: &Config,
    searches: &[db::Search],
) -> Result<ProcessCounts> {
    let mut trips = Vec::with_capacity(searches.len());
    let mut ids = Vec::with_capacity(searches.len());
    for search in searches {
        match parser::process_search(search) {
            Ok(trip) => {
                trips.push(trip);
                ids.push(search.id);
            }
            // Bad stored dates are data bugs, not reasons to halt the run
            Err(e) => warn!("{e:#}"),
        }
    }

    let batch = parser::assemble(trips);
    let saved = db::save_batch(conn, &batch, cfg.schema_mode)?;
    db::mark_processed(conn, &ids)?;

    Ok(ProcessCounts {
        searches: ids.len(),
        records: batch.records.len(),
        saved,
        failures: batch.failures.len(),
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
