//! lhapi - Lufthansa Open API client
//!
//! A command-line client for flight status and reference data,
//! authenticated with OAuth2 client credentials.

mod api;
mod auth;
mod config;
mod error;
#[cfg(test)]
mod testing;

use anyhow::Result;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::invoker::{RefreshPolicy, RetryPolicy};
use api::parse_date_time;
use config::Config;

#[derive(Parser)]
#[command(name = "lhapi")]
#[command(about = "Command-line client for the Lufthansa Open API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Skip the expiry check and only refresh the token after a failed call
    #[arg(long, global = true)]
    reactive: bool,

    /// Only retry calls rejected with 401/403 instead of any failure
    #[arg(long, global = true)]
    retry_auth_only: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store API credentials in the config file
    Configure {
        #[arg(long)]
        client_id: String,

        #[arg(long)]
        client_secret: String,

        /// Override the API base URL
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Acquire an access token and show its expiry
    Token {
        /// Request a new token even if the held one is still valid
        #[arg(short, long)]
        force: bool,
    },

    /// Status of a single flight
    Flight {
        /// Flight number, e.g. LH400
        flight_number: String,

        /// Departure date (yyyy-MM-dd), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Arrivals at an airport
    Arrivals {
        /// IATA airport code, e.g. FRA
        airport_code: String,

        /// Window start (yyyy-MM-ddTHH:mm), defaults to one hour ago
        #[arg(long, value_parser = parse_date_time)]
        from: Option<NaiveDateTime>,

        /// Window end (yyyy-MM-ddTHH:mm), defaults to one hour from now
        #[arg(long, value_parser = parse_date_time)]
        until: Option<NaiveDateTime>,
    },

    /// Departures from an airport
    Departures {
        /// IATA airport code, e.g. FRA
        airport_code: String,

        /// Window start (yyyy-MM-ddTHH:mm), defaults to one hour ago
        #[arg(long, value_parser = parse_date_time)]
        from: Option<NaiveDateTime>,

        /// Window end (yyyy-MM-ddTHH:mm), defaults to one hour from now
        #[arg(long, value_parser = parse_date_time)]
        until: Option<NaiveDateTime>,
    },

    /// Airport reference data
    Airports {
        /// IATA airport code; lists all airports when omitted
        airport_code: Option<String>,

        /// Response language
        #[arg(short, long)]
        lang: Option<String>,

        /// Only airports served by Lufthansa
        #[arg(long)]
        lh_operated: Option<bool>,
    },

    /// Airports nearest to a coordinate
    Nearest {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,

        #[arg(allow_negative_numbers = true)]
        longitude: f64,

        /// Response language
        #[arg(short, long)]
        lang: Option<String>,
    },
}

/// Default `[now - 1h, now + 1h]` window, as local time.
fn time_window(
    from: Option<NaiveDateTime>,
    until: Option<NaiveDateTime>,
) -> (NaiveDateTime, NaiveDateTime) {
    let now = Local::now().naive_local();
    (
        from.unwrap_or(now - Duration::hours(1)),
        until.unwrap_or(now + Duration::hours(1)),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = Config::load()?;
    if cli.reactive {
        config.refresh_policy = RefreshPolicy::Reactive;
    }
    if cli.retry_auth_only {
        config.retry_policy = RetryPolicy::AuthRejections;
    }

    match cli.command {
        Commands::Configure {
            client_id,
            client_secret,
            base_url,
        } => {
            // Environment overrides must not end up in the saved file.
            let mut config = Config::load_file()?;
            config.set_credentials(client_id, client_secret, base_url)?;
            config.save()?;
            println!("Saved configuration to {}", Config::config_path()?.display());
        }
        Commands::Token { force } => {
            tracing::info!("Requesting access token...");
            api::token(&config, force).await?;
        }
        Commands::Flight {
            flight_number,
            date,
        } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            api::flight_status(&config, &flight_number, date).await?;
        }
        Commands::Arrivals {
            airport_code,
            from,
            until,
        } => {
            let (from, until) = time_window(from, until);
            api::arrivals(&config, &airport_code, from, until).await?;
        }
        Commands::Departures {
            airport_code,
            from,
            until,
        } => {
            let (from, until) = time_window(from, until);
            api::departures(&config, &airport_code, from, until).await?;
        }
        Commands::Airports {
            airport_code,
            lang,
            lh_operated,
        } => {
            api::airports(
                &config,
                airport_code.as_deref(),
                lang.as_deref(),
                lh_operated,
            )
            .await?;
        }
        Commands::Nearest {
            latitude,
            longitude,
            lang,
        } => {
            api::nearest_airports(&config, latitude, longitude, lang.as_deref()).await?;
        }
    }

    Ok(())
}
