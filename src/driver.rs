//! Route driver: walks the Google Flights search UI over chromedriver
//! and captures the accessibility label of the top offer for each leg.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::{Config, RouteSpec};
use crate::db::{self, ScrapeRow};
use crate::webdriver::Session;

const FLIGHTS_URL: &str = "https://www.google.com/travel/flights";

/// Offer cards carry both phrases in their label; everything else on the
/// results page carries at most one.
const OFFER_XPATH: &str = "//div[contains(@aria-label, 'round trip total') \
    and contains(@aria-label, 'Select flight')]";

const SETTLE: Duration = Duration::from_secs(1);
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

/// Drive every route, saving each result to the DB as it lands. Routes
/// run sequentially: the search UI is rate-sensitive and the trip ids
/// already keep results independent.
pub async fn scrape_routes(
    conn: &Connection,
    cfg: &Config,
    routes: &[RouteSpec],
) -> Result<ScrapeStats> {
    let total = routes.len();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut ok = 0usize;
    let mut errors = 0usize;
    for route in routes {
        let row = scrape_with_retry(cfg, route).await;
        if row.error.is_some() {
            errors += 1;
        } else {
            ok += 1;
        }
        db::insert_search(conn, &row)?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Scraped {} routes ({} ok, {} errors)", total, ok, errors);
    Ok(ScrapeStats { total, ok, errors })
}

async fn scrape_with_retry(cfg: &Config, route: &RouteSpec) -> ScrapeRow {
    let start = Instant::now();
    let mut last_err = None;

    for attempt in 0..=MAX_RETRIES {
        match run_search(cfg, route).await {
            Ok((departure_label, return_label)) => {
                return scrape_row(route, Some((departure_label, return_label)), None, start);
            }
            Err(e) => {
                if attempt < MAX_RETRIES {
                    let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                    warn!(
                        "{} -> {} failed (attempt {}/{}), backing off {:.1}s: {e:#}",
                        route.origin,
                        route.destination,
                        attempt + 1,
                        MAX_RETRIES,
                        backoff.as_secs_f64()
                    );
                    sleep(backoff).await;
                }
                last_err = Some(e);
            }
        }
    }

    scrape_row(route, None, last_err.map(|e| format!("{e:#}")), start)
}

fn scrape_row(
    route: &RouteSpec,
    labels: Option<(String, String)>,
    error: Option<String>,
    start: Instant,
) -> ScrapeRow {
    let (departure_label, return_label) = match labels {
        Some((d, r)) => (Some(d), Some(r)),
        None => (None, None),
    };
    ScrapeRow {
        origin: route.origin.clone(),
        destination: route.destination.clone(),
        departure_date: route.departure_date.to_string(),
        return_date: route.return_date.to_string(),
        departure_label,
        return_label,
        error,
        latency_ms: Some(start.elapsed().as_millis() as i64),
    }
}

/// One full search in a fresh browser session, torn down win or lose.
async fn run_search(cfg: &Config, route: &RouteSpec) -> Result<(String, String)> {
    let session = Session::start(&cfg.webdriver_url, cfg.headless).await?;
    let result = drive(&session, route).await;
    session.quit().await;
    result
}

async fn drive(s: &Session, route: &RouteSpec) -> Result<(String, String)> {
    // The date inputs take display text, not ISO dates
    let departure_text = route.departure_date.format("%a, %b, %d").to_string();
    let return_text = route.return_date.format("%a, %b, %d").to_string();

    s.goto(FLIGHTS_URL).await?;

    // Origin
    let origin_input = s.wait_for(r#"//input[@aria-label="Where from?"]"#).await?;
    s.clear(&origin_input).await?;
    s.send_keys(&origin_input, &route.origin).await?;
    sleep(SETTLE).await;
    let origin_option = s
        .wait_for(&format!(
            r#"//li[contains(@aria-label, "{}")]"#,
            route.origin
        ))
        .await?;
    s.click(&origin_option).await?;

    // Destination (the label really does end with a space)
    sleep(SETTLE).await;
    let destination_input = s.wait_for(r#"//input[@aria-label="Where to? "]"#).await?;
    s.clear(&destination_input).await?;
    s.send_keys(&destination_input, &route.destination).await?;
    sleep(SETTLE).await;
    let destination_option = s
        .wait_for(&format!(
            r#"//li[contains(@aria-label, "{}")]"#,
            route.destination
        ))
        .await?;
    s.click(&destination_option).await?;

    // Dates; the calendar popup swallows clicks until dismissed
    sleep(SETTLE).await;
    let departure_input = s.wait_for(r#"//input[@aria-label="Departure"]"#).await?;
    s.clear(&departure_input).await?;
    s.send_keys(&departure_input, &departure_text).await?;
    dismiss_popup(s).await?;

    let return_input = s.wait_for(r#"//input[@aria-label="Return"]"#).await?;
    s.clear(&return_input).await?;
    s.send_keys(&return_input, &return_text).await?;
    dismiss_popup(s).await?;

    let search = s.wait_for(r#"//button[@aria-label="Search"]"#).await?;
    s.click(&search).await?;

    // Top departure offer
    sleep(SETTLE).await;
    let offer = s.wait_for(OFFER_XPATH).await?;
    let departure_label = s
        .attribute(&offer, "aria-label")
        .await?
        .ok_or_else(|| anyhow!("departure offer has no aria-label"))?;

    // Selecting it re-renders the list with return-leg offers
    s.execute("window.scrollTo(0, 0);").await?;
    s.click(&offer).await?;
    sleep(SETTLE).await;
    let offer = s.wait_for(OFFER_XPATH).await?;
    let return_label = s
        .attribute(&offer, "aria-label")
        .await?
        .ok_or_else(|| anyhow!("return offer has no aria-label"))?;

    Ok((departure_label, return_label))
}

/// Clicking the page header closes whatever popup is open.
async fn dismiss_popup(s: &Session) -> Result<()> {
    sleep(SETTLE).await;
    let header = s.wait_for("//div[text()='Flights']").await?;
    s.click(&header).await?;
    Ok(())
}
