mod model;
mod sled_store;

pub use model::{
    AlertDirection, PowerPhase, Problem, ProblemStatus, ProblemType, Rack, SensorReading,
    ThresholdSet,
};
pub use sled_store::SledTelemetryStore;

/// Fixed query contract of the persistence collaborator.
///
/// Every method is total: failures are logged inside the implementation and
/// surface as empty vectors, `None`, or `false`, never as panics or errors.
pub trait TelemetryStore {
    fn get_racks(&self) -> Vec<Rack>;
    fn get_rack_by_name(&self, name: &str) -> Option<Rack>;
    fn get_sensor_readings(&self) -> Vec<SensorReading>;
    fn get_thresholds(&self) -> Option<ThresholdSet>;
    /// Update by name if a rack with that name exists, insert otherwise.
    /// Returns the stored rack id.
    fn upsert_rack(&self, rack: NewRack) -> Option<u64>;
    fn insert_sensor_reading(&self, reading: NewSensorReading) -> Option<u64>;
    fn insert_thresholds(&self, thresholds: ThresholdSet) -> bool;
    fn find_active_problems(&self) -> Vec<Problem>;
    fn insert_problem(&self, problem: NewProblem) -> Option<u64>;
    fn ping(&self) -> bool;
}

/// Rack payload before the store has assigned an id.
#[derive(Debug, Clone)]
pub struct NewRack {
    pub name: String,
    pub site: String,
    pub datacenter: String,
    pub under_maintenance: bool,
    pub max_power_kw: f64,
    pub max_units: u32,
    pub free_units: u32,
    pub phase: PowerPhase,
}

#[derive(Debug, Clone)]
pub struct NewSensorReading {
    pub rack_id: u64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub total_power_kw: f64,
    pub total_current_a: f64,
    pub total_voltage_v: f64,
}

#[derive(Debug, Clone)]
pub struct NewProblem {
    pub rack_id: u64,
    pub problem_type: ProblemType,
    pub measured_value: f64,
    pub threshold_value: f64,
    pub alert_direction: AlertDirection,
}
