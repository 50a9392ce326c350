//! API client module for the Lufthansa Open API

pub mod client;
mod flights;
pub mod invoker;
mod references;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::config::Config;
use client::LhApiClient;

pub use flights::parse_date_time;

fn connect(config: &Config) -> Result<LhApiClient> {
    Ok(LhApiClient::new(
        config.credentials()?,
        config.client_options(),
    )?)
}

fn print_json(value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to format response")?;
    println!("{}", text);
    Ok(())
}

/// Acquire an access token and show how long it stays usable
pub async fn token(config: &Config, force: bool) -> Result<()> {
    let client = connect(config)?;
    let store = client.invoker().token_store();
    let acquired = if force {
        store.force_refresh().await
    } else {
        store.ensure_valid().await
    };
    acquired.context("Could not obtain an access token")?;

    if let Some(token) = store.access_token().await {
        println!("Access token: acquired");
        println!("  issued_at:  {}", token.issued_at());
        println!("  expires_at: {} (15 min safety buffer applied)", token.expires_at());
    }
    Ok(())
}

/// Show the status of a single flight
pub async fn flight_status(config: &Config, flight_number: &str, date: NaiveDate) -> Result<()> {
    let client = connect(config)?;
    let value = client
        .flight_status(flight_number, date)
        .await
        .with_context(|| format!("Failed to fetch status of {} on {}", flight_number, date))?;
    print_json(&value)
}

/// Show arrivals at an airport within a time window
pub async fn arrivals(
    config: &Config,
    airport_code: &str,
    from: NaiveDateTime,
    until: NaiveDateTime,
) -> Result<()> {
    let client = connect(config)?;
    let value = client
        .arrivals_status(airport_code, from, until)
        .await
        .with_context(|| format!("Failed to fetch arrivals at {}", airport_code))?;
    print_json(&value)
}

/// Show departures from an airport within a time window
pub async fn departures(
    config: &Config,
    airport_code: &str,
    from: NaiveDateTime,
    until: NaiveDateTime,
) -> Result<()> {
    let client = connect(config)?;
    let value = client
        .departures_status(airport_code, from, until)
        .await
        .with_context(|| format!("Failed to fetch departures from {}", airport_code))?;
    print_json(&value)
}

/// Show airport reference data
pub async fn airports(
    config: &Config,
    airport_code: Option<&str>,
    lang: Option<&str>,
    lh_operated: Option<bool>,
) -> Result<()> {
    let client = connect(config)?;
    let value = client
        .airports(airport_code, lang, lh_operated)
        .await
        .context("Failed to fetch airports")?;
    print_json(&value)
}

/// Show the airports nearest to a coordinate
pub async fn nearest_airports(
    config: &Config,
    latitude: f64,
    longitude: f64,
    lang: Option<&str>,
) -> Result<()> {
    let client = connect(config)?;
    let value = client
        .nearest_airports(latitude, longitude, lang)
        .await
        .with_context(|| format!("Failed to fetch airports near {},{}", latitude, longitude))?;
    print_json(&value)
}
