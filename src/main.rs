//! CLI entry point for linetracker.
//!
//! Provides subcommands for loading stations and their schedules, polling
//! live train predictions into storage, and querying what was stored.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use linetracker::{
    config::Config,
    fetch::{ApiKey, BasicClient, MetroApi, RetryPolicy, TransitApi},
    ingest::{Poller, load_stations},
    output::{board_line, print_json},
    rate_limit::RateLimiter,
    repository::{PredictionQuery, PredictionRepository, StationRepository},
    schedule::{ScheduleAggregator, compute_operating_window, current_window},
    store::{DynamoStore, Store},
};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "linetracker")]
#[command(about = "Collects and serves metro rail arrival predictions", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true, default_value = "config.json")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every station and its schedule into the station table
    LoadStations,
    /// Poll live predictions into the prediction table until Ctrl-C
    Poll,
    /// Show predictions from the last ten minutes for one station
    Trains {
        /// Station code, e.g. "A01"
        #[arg(short, long)]
        location: String,

        /// Line code, e.g. "RD"
        #[arg(long)]
        line: Option<String>,

        /// Destination name, e.g. "Glenmont"
        #[arg(short, long)]
        direction: Option<String>,

        /// Print one line per train instead of JSON
        #[arg(long, default_value_t = false)]
        board: bool,
    },
    /// List stored stations
    Stations {
        /// Only stations that are a destination of some station
        #[arg(long, default_value_t = false)]
        destinations: bool,
    },
    /// Show the system operating window
    Window {
        /// Service day (YYYY-MM-DD), defaults to the current service window
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/linetracker.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("linetracker.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Ok(key) = std::env::var("METRO_API_KEY") {
        config.api_key = key;
    }

    let store: Arc<dyn Store> =
        Arc::new(DynamoStore::connect(config.storage.endpoint.as_deref()).await);
    let stations = StationRepository::new(store.clone(), &config.storage.station_table);
    let predictions = PredictionRepository::new(store, &config.storage.prediction_table);

    match cli.command {
        Commands::LoadStations => {
            let api = metro_api(&config)?;
            let report = load_stations(
                api.as_ref(),
                &stations,
                &RateLimiter::default(),
                RetryPolicy::default(),
            )
            .await?;
            print_json(&serde_json::json!({
                "stations": report.stations,
                "withSchedule": report.with_schedule,
                "rejected": report.rejected,
                "failedWrites": report.failed_writes,
            }))?;
        }
        Commands::Poll => {
            let api = metro_api(&config)?;
            let aggregator =
                ScheduleAggregator::new(stations, config.timezone, config.window_refresh());
            let poller = Poller::new(api, predictions, Some(aggregator), &config);

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!("Ctrl-C received, shutting down"),
                    Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
                }
                let _ = shutdown_tx.send(true);
            });

            poller.run(shutdown_rx).await;
        }
        Commands::Trains {
            location,
            line,
            direction,
            board,
        } => {
            let query = PredictionQuery::new(&location, line.as_deref(), direction.as_deref())?;
            let records = predictions.query_predictions(&query, Utc::now()).await?;
            if board {
                for record in &records {
                    println!("{}", board_line(record));
                }
            } else {
                print_json(&records)?;
            }
        }
        Commands::Stations { destinations } => {
            let listed = if destinations {
                stations.destination_stations().await?
            } else {
                stations.list().await?
            };
            info!(count = listed.len(), "Stations listed");
            print_json(&listed)?;
        }
        Commands::Window { date } => {
            let listed = stations.list().await?;
            let window = match date {
                Some(date) => compute_operating_window(&listed, date),
                None => current_window(
                    &listed,
                    Utc::now().with_timezone(&config.timezone).naive_local(),
                ),
            }
            .context("failed to compute operating window")?;
            print_json(&window)?;
        }
    }

    Ok(())
}

/// Builds the authenticated upstream client.
fn metro_api(config: &Config) -> Result<Arc<dyn TransitApi>> {
    if config.api_key.is_empty() {
        warn!("No API key configured, upstream requests will likely be rejected");
    }
    let client = BasicClient::new(config.request_timeout())?;
    let client = ApiKey::metro(client, &config.api_key)?;
    Ok(Arc::new(MetroApi::new(client, config.clone())))
}
