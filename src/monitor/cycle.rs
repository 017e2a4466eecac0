use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::config::{Config, ThresholdDefaults};
use crate::fetch::{FetchOptions, RemoteFetch, is_api_reachable};
use crate::store::{
    NewProblem, NewSensorReading, PowerPhase, Problem, TelemetryStore, ThresholdSet,
};

use super::evaluator::{ResolvedReading, evaluate_readings};
use super::records::{RackRecord, SensorRecord, parse_records};
use super::status::CycleState;

/// One monitoring cycle: probe, fetch, upsert, evaluate.
///
/// Every step is isolated: a failing step logs and the cycle moves on with
/// what it has, so one bad upstream or record never aborts the whole run.
pub(super) async fn run_cycle<S, R>(
    config: &Config,
    client: &reqwest::Client,
    fetcher: &R,
    store: Option<&S>,
    state: &Arc<Mutex<CycleState>>,
) where
    S: TelemetryStore,
    R: RemoteFetch,
{
    let timer = Instant::now();
    {
        let mut state = state.lock().await;
        if !state.begin_cycle(Utc::now()) {
            log::warn!("cycle_skipped reason=already_running");
            return;
        }
    }

    // Step 1: reachability. Nothing to do when both upstreams are down.
    let racks_reachable = is_api_reachable(client, &config.api.racks_url).await;
    let sensors_reachable = is_api_reachable(client, &config.api.sensors_url).await;
    {
        let mut state = state.lock().await;
        state.racks_api_reachable = racks_reachable;
        state.sensors_api_reachable = sensors_reachable;
    }
    if !racks_reachable && !sensors_reachable {
        log::warn!("cycle_abandoned reason=both_apis_unreachable");
        let duration_ms = timer.elapsed().as_millis() as u64;
        state.lock().await.abandon_cycle(duration_ms);
        return;
    }

    // Step 2: no store, no cycle.
    let store = match store {
        Some(store) if store.ping() => store,
        Some(_) => {
            log::warn!("cycle_abandoned reason=store_unavailable");
            let duration_ms = timer.elapsed().as_millis() as u64;
            state.lock().await.abandon_cycle(duration_ms);
            return;
        }
        None => {
            log::info!("cycle_abandoned reason=store_disabled");
            let duration_ms = timer.elapsed().as_millis() as u64;
            state.lock().await.abandon_cycle(duration_ms);
            return;
        }
    };

    // Step 3: fetch both sets independently; one failing must not starve the
    // other.
    let options = FetchOptions::from_config(config);
    let rack_values = match fetcher.fetch(&config.api.racks_url, "racks", &options).await {
        Ok(records) => records,
        Err(error) => {
            log::error!("rack_fetch_failed error={}", error);
            Vec::new()
        }
    };
    let sensor_values = match fetcher
        .fetch(&config.api.sensors_url, "sensor-readings", &options)
        .await
    {
        Ok(records) => records,
        Err(error) => {
            log::error!("sensor_fetch_failed error={}", error);
            Vec::new()
        }
    };

    // Step 4: current threshold set, falling back to the compiled-in limits.
    let thresholds = match store.get_thresholds() {
        Some(thresholds) => thresholds,
        None => {
            log::debug!("thresholds_fallback source=compiled_defaults");
            compiled_thresholds(&config.thresholds)
        }
    };

    // Step 5: upsert racks by name, each one on its own.
    let rack_records: Vec<RackRecord> = parse_records(rack_values, "racks");
    let mut rack_index: HashMap<String, (u64, PowerPhase)> = HashMap::new();
    let mut racks_upserted = 0u64;
    for record in rack_records {
        let name = record.name.clone();
        let phase = record.phase;
        match store.upsert_rack(record.into_new_rack()) {
            Some(rack_id) => {
                rack_index.insert(name, (rack_id, phase));
                racks_upserted += 1;
            }
            None => log::warn!("rack_upsert_skipped name={}", name),
        }
    }

    // Step 6: store readings for resolvable racks; count and skip the rest.
    let sensor_records: Vec<SensorRecord> = parse_records(sensor_values, "sensor-readings");
    let mut resolved_readings: Vec<ResolvedReading> = Vec::new();
    let mut unresolved_racks = 0u64;
    let mut readings_stored = 0u64;
    for record in sensor_records {
        let resolved = rack_index.get(&record.rack_name).copied().or_else(|| {
            store
                .get_rack_by_name(&record.rack_name)
                .map(|rack| (rack.id, rack.phase))
        });
        let Some((rack_id, phase)) = resolved else {
            unresolved_racks += 1;
            continue;
        };

        if store
            .insert_sensor_reading(NewSensorReading {
                rack_id,
                temperature_c: record.temperature_c,
                humidity_pct: record.humidity_pct,
                total_power_kw: record.total_power_kw,
                total_current_a: record.total_current_a,
                total_voltage_v: record.total_voltage_v,
            })
            .is_some()
        {
            readings_stored += 1;
        }

        resolved_readings.push(ResolvedReading {
            rack_id,
            phase,
            temperature_c: record.temperature_c,
            humidity_pct: record.humidity_pct,
            total_current_a: record.total_current_a,
        });
    }
    if unresolved_racks > 0 {
        log::warn!("readings_skipped_unresolved_rack count={}", unresolved_racks);
    }

    // Step 7: open problems for fresh violations. At most one active problem
    // may exist per (rack, type, direction); the active set is loaded once
    // per cycle and extended as inserts land, which also collapses duplicate
    // violations within this cycle.
    let mut active_keys: HashSet<_> = store
        .find_active_problems()
        .iter()
        .map(Problem::dedup_key)
        .collect();
    let mut problems_created = 0u64;
    for violation in evaluate_readings(&thresholds, &resolved_readings) {
        let key = violation.dedup_key();
        if active_keys.contains(&key) {
            continue;
        }

        if store
            .insert_problem(NewProblem {
                rack_id: violation.rack_id,
                problem_type: violation.problem_type,
                measured_value: violation.measured_value,
                threshold_value: violation.threshold_value,
                alert_direction: violation.alert_direction,
            })
            .is_some()
        {
            active_keys.insert(key);
            problems_created += 1;
            log::warn!(
                "problem_opened rack_id={} type={} direction={} measured={} threshold={}",
                violation.rack_id,
                violation.problem_type,
                violation.alert_direction,
                violation.measured_value,
                violation.threshold_value
            );
        }
    }

    // Step 8: summary counters for the status surface.
    let duration_ms = timer.elapsed().as_millis() as u64;
    {
        let mut state = state.lock().await;
        state.finish_cycle(duration_ms, problems_created, readings_stored);
    }

    tracing::info!(
        target: "monitor",
        module = "monitor",
        duration_ms,
        racks_upserted,
        readings_stored,
        problems_created,
        unresolved_racks,
        "cycle_summary"
    );
}

fn compiled_thresholds(defaults: &ThresholdDefaults) -> ThresholdSet {
    ThresholdSet {
        min_temp: defaults.min_temp,
        max_temp: defaults.max_temp,
        min_humidity: defaults.min_humidity,
        max_humidity: defaults.max_humidity,
        max_current_single_phase_a: defaults.max_current_single_phase_a,
        max_current_three_phase_a: defaults.max_current_three_phase_a,
        created_at: Utc::now(),
    }
}
