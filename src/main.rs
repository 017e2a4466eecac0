mod app_context;
mod config;
mod fallback;
mod fetch;
mod jobs;
mod monitor;
mod store;

use tracing_subscriber::EnvFilter;

use crate::app_context::AppContext;
use crate::config::{Config, load_config};
use crate::fetch::is_api_reachable;
use crate::store::SledTelemetryStore;

fn init_json_logging() {
    if let Err(error) = tracing_log::LogTracer::init() {
        eprintln!(
            "logging bridge initialization failed (continuing with existing logger): {}",
            error
        );
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .finish();

    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("global logger initialization failed: {}", error);
    }
}

const CONFIG_PATH: &str = "config.toml";

async fn log_api_probes(client: &reqwest::Client, config: &Config) {
    for (name, url) in [
        ("racks", &config.api.racks_url),
        ("sensor-readings", &config.api.sensors_url),
    ] {
        if is_api_reachable(client, url).await {
            log::info!("api_probe_ok source={} url={}", name, url);
        } else {
            log::warn!("api_probe_degraded source={} url={}", name, url);
        }
    }
}

#[tokio::main]
async fn main() {
    init_json_logging();

    let config: Config = match load_config(CONFIG_PATH) {
        Ok(config) => config,
        Err(error) => {
            log::error!("Configuration error: {}", error);
            return;
        }
    };

    log::info!("Rackwatch is starting...");

    let store = match SledTelemetryStore::open_from_config(&config) {
        Ok(Some(store)) => Some(store),
        Ok(None) => {
            log::warn!("store_degraded reason=disabled_in_config");
            None
        }
        Err(error) => {
            log::warn!("store_degraded reason=open_failed error={}", error);
            None
        }
    };

    let context = match AppContext::new(config, store) {
        Ok(context) => context,
        Err(error) => {
            log::error!("HTTP client initialization failed: {}", error);
            return;
        }
    };

    log_api_probes(&context.client, &context.config).await;

    monitor::start_monitoring(&context, None).await;

    if let Err(error) = tokio::signal::ctrl_c().await {
        log::error!("shutdown_signal_failed error={}", error);
    }

    log::info!("Rackwatch is shutting down...");
    monitor::stop_monitoring(&context).await;

    let status = monitor::get_monitoring_status(&context).await;
    log::info!(
        "final_status cycles_completed={} problems_detected={} readings_stored={}",
        status.cycles_completed,
        status.problems_detected,
        status.readings_stored
    );
    for circuit in monitor::get_circuit_breaker_status(&context).await {
        log::info!(
            "final_circuit endpoint={} status={} consecutive_failures={}",
            circuit.endpoint,
            circuit.status,
            circuit.consecutive_failures
        );
    }
}
