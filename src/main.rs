//! Tracking briefing - spoken shipment summaries and proactive events
//!
//! Module structure:
//! - `domain/` - Core types (records, packages, events, status tags)
//! - `io/` - External interfaces (AfterShip, Google Maps, state file)
//! - `services/` - Pipeline stages and the two briefing entry points
//! - `infra/` - Infrastructure (Config, Metrics)

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use tracking_brief::error::BriefingError;
use tracking_brief::infra::{Config, Metrics};
use tracking_brief::io::{AftershipClient, GoogleMapsClient, StateStore, StoredState};
use tracking_brief::services::device::{resolve_device, DeviceResolution};
use tracking_brief::services::speech::{say_as, strip_markup, SayAs};
use tracking_brief::services::{Briefing, BriefingSettings, Cutoff};

const MISSING_API_KEY_MESSAGE: &str =
    "The Aftership API key is not configured. Please check the configuration file.";

const INVALID_CONFIG_MESSAGE: &str = "The configuration file is invalid:";

fn error_message() -> String {
    format!("{}, something went wrong.", say_as("Uh oh", SayAs::Interjection))
}

/// Tracking briefing - where is my stuff?
#[derive(Parser, Debug)]
#[command(name = "tracking-brief", version, about)]
struct Args {
    /// Path to TOML configuration file (else CONFIG_FILE, else config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Speak the current tracking summary
    Narrate {
        /// Courier name, status or free-text filter
        query: Vec<String>,
        /// Also print the narrative without markup
        #[arg(long)]
        plain: bool,
    },
    /// Print proactive events as JSON lines
    Events {
        /// Rolling window in minutes, overriding the stored last event time
        #[arg(long)]
        interval_minutes: Option<u32>,
    },
}

fn load_state(store: &StateStore) -> StoredState {
    match store.load() {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "state_load_failed");
            StoredState::default()
        }
    }
}

fn save_state(store: &StateStore, state: &StoredState) {
    if let Err(e) = store.save(state) {
        error!(error = %format!("{:#}", e), "state_save_failed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config_path = Config::resolve_config_path(args.config.as_deref());
    let config = match Config::load_from_path(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %format!("{:#}", e), "config_invalid");
            println!("{} {:#}", INVALID_CONFIG_MESSAGE, e);
            return Ok(());
        }
    };

    info!(
        config_file = %config.config_file(),
        endpoint = %config.aftership_endpoint(),
        days_search = config.days_search(),
        count_limit = config.tracking_count_limit(),
        default_timezone = %config.default_timezone(),
        grouping = ?config.grouping(),
        "config_loaded"
    );

    if let Err(e) = config.validate() {
        warn!(error = %e, "configuration_invalid");
        println!("{}", MISSING_API_KEY_MESSAGE);
        return Ok(());
    }

    let source = Arc::new(AftershipClient::new(config.aftership_endpoint(), config.aftership_api_key())?);
    let geocoder =
        Arc::new(GoogleMapsClient::new(config.google_maps_endpoint(), config.google_maps_api_key())?);
    let metrics = Arc::new(Metrics::new());
    let briefing = Briefing::new(
        source,
        geocoder.clone(),
        BriefingSettings::from_config(&config),
        metrics.clone(),
    );

    let store = StateStore::new(config.state_file());
    let mut state = load_state(&store);
    let now = Utc::now();

    match args.command {
        Command::Narrate { query, plain } => {
            let device = resolve_device(
                geocoder.as_ref(),
                config.device_address_query().as_deref(),
                state.device.as_ref(),
                config.default_timezone(),
                now,
            )
            .await;
            info!(timezone = %device.ctx.timezone, location = ?device.ctx.location, "device_context");

            if let Some(resolved) = device.resolved.clone() {
                state.device = Some(resolved);
                save_state(&store, &state);
            }

            let keyword = query.join(" ");
            let keyword = (!keyword.trim().is_empty()).then_some(keyword.as_str());

            match briefing.build_narrative(&device.ctx, keyword, &device.footnotes).await {
                Ok(narrative) => {
                    println!("{}", narrative);
                    if plain {
                        println!("{}", strip_markup(&narrative));
                    }
                }
                Err(e) => {
                    error!(error = %e, "narrative_failed");
                    println!("{}", error_message());
                }
            }
        }
        Command::Events { interval_minutes } => {
            let device = DeviceResolution::from_stored(state.device.as_ref(), config.default_timezone(), now);
            let cutoff = match (interval_minutes, state.last_proactive_event) {
                (Some(minutes), _) => Cutoff::Interval(Duration::minutes(i64::from(minutes))),
                (None, Some(last)) => Cutoff::Since(last),
                (None, None) => Cutoff::Interval(Duration::minutes(i64::from(config.schedule_rate_minutes()))),
            };
            info!(cutoff = ?cutoff, "events_cutoff");

            match briefing.build_proactive_events(&device.ctx, cutoff).await {
                Ok(events) => {
                    for event in &events {
                        println!("{}", event.to_json());
                    }
                    state.last_proactive_event = Some(now);
                    save_state(&store, &state);
                }
                Err(e @ BriefingError::SourceFetch(_)) => {
                    error!(error = %e, "proactive_events_failed");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    metrics.report().log();
    Ok(())
}
