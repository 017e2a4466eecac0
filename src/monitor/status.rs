use chrono::{DateTime, Utc};
use serde::Serialize;

/// Shared monitoring state: the Idle/Running guard plus the counters exposed
/// through the status surface. Lives behind `Arc<Mutex<…>>` in the app
/// context.
#[derive(Debug, Default)]
pub struct CycleState {
    pub(crate) active: bool,
    pub(crate) running: bool,
    pub(crate) last_run: Option<DateTime<Utc>>,
    pub(crate) last_run_duration_ms: Option<u64>,
    pub(crate) racks_api_reachable: bool,
    pub(crate) sensors_api_reachable: bool,
    pub(crate) cycles_completed: u64,
    pub(crate) problems_detected: u64,
    pub(crate) readings_stored: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorSnapshot {
    pub active: bool,
    pub running: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub last_run_duration_ms: Option<u64>,
    pub racks_api_reachable: bool,
    pub sensors_api_reachable: bool,
    pub cycles_completed: u64,
    pub problems_detected: u64,
    pub readings_stored: u64,
}

impl CycleState {
    /// Claim the Running guard. Returns false when a cycle is already in
    /// flight, in which case the caller must skip this invocation.
    pub(crate) fn begin_cycle(&mut self, now: DateTime<Utc>) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.last_run = Some(now);
        true
    }

    pub(crate) fn finish_cycle(&mut self, duration_ms: u64, problems: u64, readings: u64) {
        self.running = false;
        self.last_run_duration_ms = Some(duration_ms);
        self.cycles_completed += 1;
        self.problems_detected += problems;
        self.readings_stored += readings;
    }

    /// Release the guard for a cycle that ended before doing any work.
    pub(crate) fn abandon_cycle(&mut self, duration_ms: u64) {
        self.running = false;
        self.last_run_duration_ms = Some(duration_ms);
    }

    pub(crate) fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            active: self.active,
            running: self.running,
            last_run: self.last_run,
            last_run_duration_ms: self.last_run_duration_ms,
            racks_api_reachable: self.racks_api_reachable,
            sensors_api_reachable: self.sensors_api_reachable,
            cycles_completed: self.cycles_completed,
            problems_detected: self.problems_detected,
            readings_stored: self.readings_stored,
        }
    }
}
