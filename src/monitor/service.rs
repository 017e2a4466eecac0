use std::time::Instant;

use serde_json::Value;
use tokio::time::Duration;

use crate::app_context::AppContext;
use crate::fallback::{CascadeError, get_data_with_fallback};
use crate::fetch::{EndpointCircuitSnapshot, FetchError, FetchOptions, RemoteFetch};
use crate::jobs;
use crate::store::TelemetryStore;

use super::cycle::run_cycle;
use super::status::MonitorSnapshot;

/// Start the recurring monitor timer. A no-op (with a log line) when the
/// timer is already active. `interval` defaults to the configured one.
pub async fn start_monitoring(context: &AppContext, interval: Option<Duration>) {
    let mut task = context.monitor_task.lock().await;
    if task.is_some() {
        log::warn!("monitor_start_ignored reason=already_active");
        return;
    }

    let interval =
        interval.unwrap_or_else(|| Duration::from_secs(context.config.monitor.interval_secs));
    context.cycle_state.lock().await.active = true;
    *task = Some(jobs::start_monitor_job(context.clone(), interval));
    log::info!("monitor_started interval_secs={}", interval.as_secs());
}

/// Stop the timer. An in-flight cycle is not cancelled; the job exits at its
/// next tick boundary.
pub async fn stop_monitoring(context: &AppContext) {
    let mut task = context.monitor_task.lock().await;
    if task.take().is_none() {
        return;
    }

    context.monitor_stop.notify_one();
    context.cycle_state.lock().await.active = false;
    log::info!("monitor_stopped");
}

/// Run one cycle out of band. Skipped with a log line when a timer-driven
/// cycle is already running.
pub async fn run_monitoring_cycle(context: &AppContext) {
    let fetcher = context.fetcher();
    run_cycle(
        &context.config,
        &context.client,
        &fetcher,
        context.store.as_ref(),
        &context.cycle_state,
    )
    .await;
}

pub async fn get_monitoring_status(context: &AppContext) -> MonitorSnapshot {
    context.cycle_state.lock().await.snapshot()
}

pub async fn get_circuit_breaker_status(context: &AppContext) -> Vec<EndpointCircuitSnapshot> {
    context.breaker.lock().await.snapshot(Instant::now())
}

/// Rack rows for external consumers, read through the full cascade:
/// store first, then the upstream API, then synthetic data when configured.
pub async fn get_rack_data(context: &AppContext) -> Result<Vec<Value>, CascadeError> {
    let store = context.store.clone();
    let fetcher = context.fetcher();
    get_data_with_fallback(
        || async move {
            store
                .map(|store| store_rows(store.get_racks()))
                .unwrap_or_default()
        },
        &fetcher,
        &context.config.api.racks_url,
        "racks",
        &FetchOptions::from_config(&context.config),
    )
    .await
}

/// Sensor reading rows through the same cascade as [`get_rack_data`].
pub async fn get_sensor_data(context: &AppContext) -> Result<Vec<Value>, CascadeError> {
    let store = context.store.clone();
    let fetcher = context.fetcher();
    get_data_with_fallback(
        || async move {
            store
                .map(|store| store_rows(store.get_sensor_readings()))
                .unwrap_or_default()
        },
        &fetcher,
        &context.config.api.sensors_url,
        "sensor-readings",
        &FetchOptions::from_config(&context.config),
    )
    .await
}

fn store_rows<T: serde::Serialize>(rows: Vec<T>) -> Vec<Value> {
    rows.iter()
        .filter_map(|row| serde_json::to_value(row).ok())
        .collect()
}

/// One-off resilient fetch against an arbitrary upstream URL.
pub async fn fetch_external_api(
    context: &AppContext,
    url: &str,
    source_name: &str,
    options: &FetchOptions,
) -> Result<Vec<Value>, FetchError> {
    context.fetcher().fetch(url, source_name, options).await
}
