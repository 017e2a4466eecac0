use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use chrono::Utc;

use crate::config::Config;

use super::{
    NewProblem, NewRack, NewSensorReading, Problem, ProblemStatus, Rack, SensorReading,
    TelemetryStore, ThresholdSet,
};

/// Embedded telemetry store.
///
/// Tree layout:
/// - `racks`: keyed by rack name (names are unique, which makes upsert-by-name
///   a plain insert-or-overwrite)
/// - `readings`: append-only, keyed by timestamp millis (be bytes) + sequence
/// - `problems`: keyed by problem id (be bytes)
/// - `thresholds`: append-only, keyed by timestamp millis (be bytes) + sequence
#[derive(Clone)]
pub struct SledTelemetryStore {
    db: sled::Db,
    racks: sled::Tree,
    readings: sled::Tree,
    problems: sled::Tree,
    thresholds: sled::Tree,
    sequence: Arc<AtomicU32>,
}

impl SledTelemetryStore {
    pub fn open_from_config(config: &Config) -> Result<Option<Self>, sled::Error> {
        if !config.store.enabled {
            return Ok(None);
        }

        Self::open(&config.store.path).map(Some)
    }

    pub fn open(path: &str) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        let racks = db.open_tree("racks")?;
        let readings = db.open_tree("readings")?;
        let problems = db.open_tree("problems")?;
        let thresholds = db.open_tree("thresholds")?;
        Ok(Self {
            db,
            racks,
            readings,
            problems,
            thresholds,
            sequence: Arc::new(AtomicU32::new(0)),
        })
    }

    fn next_id(&self) -> Option<u64> {
        match self.db.generate_id() {
            Ok(id) => Some(id),
            Err(error) => {
                log::warn!("store_id_generation_failed error={}", error);
                None
            }
        }
    }

    fn timestamped_key(&self, millis: i64) -> Vec<u8> {
        let mut key = Vec::with_capacity(12);
        key.extend_from_slice(&millis.to_be_bytes());
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        key.extend_from_slice(&seq.to_be_bytes());
        key
    }
}

impl TelemetryStore for SledTelemetryStore {
    fn get_racks(&self) -> Vec<Rack> {
        self.racks
            .iter()
            .filter_map(|item| item.ok())
            .filter_map(|(_, value)| serde_json::from_slice::<Rack>(&value).ok())
            .collect()
    }

    fn get_rack_by_name(&self, name: &str) -> Option<Rack> {
        self.racks
            .get(name.as_bytes())
            .ok()
            .flatten()
            .and_then(|value| serde_json::from_slice::<Rack>(&value).ok())
    }

    fn get_sensor_readings(&self) -> Vec<SensorReading> {
        self.readings
            .iter()
            .filter_map(|item| item.ok())
            .filter_map(|(_, value)| serde_json::from_slice::<SensorReading>(&value).ok())
            .collect()
    }

    fn get_thresholds(&self) -> Option<ThresholdSet> {
        // Insert-only tree ordered by timestamp key: the last entry is the
        // authoritative row.
        self.thresholds
            .last()
            .ok()
            .flatten()
            .and_then(|(_, value)| serde_json::from_slice::<ThresholdSet>(&value).ok())
            .or_else(|| {
                // Fall back to a full scan in case the tail entry was corrupt.
                self.thresholds
                    .iter()
                    .filter_map(|item| item.ok())
                    .filter_map(|(_, value)| serde_json::from_slice::<ThresholdSet>(&value).ok())
                    .max_by_key(|row| row.created_at)
            })
    }

    fn upsert_rack(&self, rack: NewRack) -> Option<u64> {
        let now = Utc::now();
        let stored = match self.get_rack_by_name(&rack.name) {
            Some(existing) => Rack {
                id: existing.id,
                name: rack.name,
                site: rack.site,
                datacenter: rack.datacenter,
                under_maintenance: rack.under_maintenance,
                max_power_kw: rack.max_power_kw,
                max_units: rack.max_units,
                free_units: rack.free_units,
                phase: rack.phase,
                created_at: existing.created_at,
                updated_at: now,
            },
            None => Rack {
                id: self.next_id()?,
                name: rack.name,
                site: rack.site,
                datacenter: rack.datacenter,
                under_maintenance: rack.under_maintenance,
                max_power_kw: rack.max_power_kw,
                max_units: rack.max_units,
                free_units: rack.free_units,
                phase: rack.phase,
                created_at: now,
                updated_at: now,
            },
        };

        let payload = serde_json::to_vec(&stored).ok()?;
        match self.racks.insert(stored.name.as_bytes(), payload) {
            Ok(_) => Some(stored.id),
            Err(error) => {
                log::warn!("rack_upsert_failed name={} error={}", stored.name, error);
                None
            }
        }
    }

    fn insert_sensor_reading(&self, reading: NewSensorReading) -> Option<u64> {
        let now = Utc::now();
        let stored = SensorReading {
            id: self.next_id()?,
            rack_id: reading.rack_id,
            temperature_c: reading.temperature_c,
            humidity_pct: reading.humidity_pct,
            total_power_kw: reading.total_power_kw,
            total_current_a: reading.total_current_a,
            total_voltage_v: reading.total_voltage_v,
            created_at: now,
        };

        let key = self.timestamped_key(now.timestamp_millis());
        let payload = serde_json::to_vec(&stored).ok()?;
        match self.readings.insert(key, payload) {
            Ok(_) => Some(stored.id),
            Err(error) => {
                log::warn!(
                    "reading_insert_failed rack_id={} error={}",
                    stored.rack_id,
                    error
                );
                None
            }
        }
    }

    fn insert_thresholds(&self, thresholds: ThresholdSet) -> bool {
        let key = self.timestamped_key(thresholds.created_at.timestamp_millis());
        let Ok(payload) = serde_json::to_vec(&thresholds) else {
            return false;
        };
        match self.thresholds.insert(key, payload) {
            Ok(_) => true,
            Err(error) => {
                log::warn!("thresholds_insert_failed error={}", error);
                false
            }
        }
    }

    fn find_active_problems(&self) -> Vec<Problem> {
        self.problems
            .iter()
            .filter_map(|item| item.ok())
            .filter_map(|(_, value)| serde_json::from_slice::<Problem>(&value).ok())
            .filter(|problem| problem.status == ProblemStatus::Active)
            .collect()
    }

    fn insert_problem(&self, problem: NewProblem) -> Option<u64> {
        let now = Utc::now();
        let stored = Problem {
            id: self.next_id()?,
            rack_id: problem.rack_id,
            problem_type: problem.problem_type,
            measured_value: problem.measured_value,
            threshold_value: problem.threshold_value,
            alert_direction: problem.alert_direction,
            status: ProblemStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let payload = serde_json::to_vec(&stored).ok()?;
        match self.problems.insert(stored.id.to_be_bytes(), payload) {
            Ok(_) => Some(stored.id),
            Err(error) => {
                log::warn!(
                    "problem_insert_failed rack_id={} type={} error={}",
                    stored.rack_id,
                    stored.problem_type,
                    error
                );
                None
            }
        }
    }

    fn ping(&self) -> bool {
        self.db.size_on_disk().is_ok()
    }
}
