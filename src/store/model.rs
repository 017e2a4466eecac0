use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerPhase {
    SinglePhase,
    ThreePhase,
}

impl Default for PowerPhase {
    fn default() -> Self {
        Self::SinglePhase
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    Temperature,
    Humidity,
    Power,
}

impl std::fmt::Display for ProblemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Temperature => write!(f, "temperature"),
            Self::Humidity => write!(f, "humidity"),
            Self::Power => write!(f, "power"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertDirection {
    High,
    Low,
}

impl std::fmt::Display for AlertDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemStatus {
    Active,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rack {
    pub id: u64,
    pub name: String,
    pub site: String,
    pub datacenter: String,
    pub under_maintenance: bool,
    pub max_power_kw: f64,
    pub max_units: u32,
    pub free_units: u32,
    pub phase: PowerPhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: u64,
    pub rack_id: u64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub total_power_kw: f64,
    pub total_current_a: f64,
    pub total_voltage_v: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: u64,
    pub rack_id: u64,
    pub problem_type: ProblemType,
    pub measured_value: f64,
    pub threshold_value: f64,
    pub alert_direction: AlertDirection,
    pub status: ProblemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Problem {
    /// Identity under the one-active-problem-per-key invariant.
    pub fn dedup_key(&self) -> (u64, ProblemType, AlertDirection) {
        (self.rack_id, self.problem_type, self.alert_direction)
    }
}

/// Versioned insert-only threshold rows; the newest row wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub min_temp: f64,
    pub max_temp: f64,
    pub min_humidity: f64,
    pub max_humidity: f64,
    pub max_current_single_phase_a: f64,
    pub max_current_three_phase_a: f64,
    pub created_at: DateTime<Utc>,
}

impl ThresholdSet {
    pub fn max_current_for(&self, phase: PowerPhase) -> f64 {
        match phase {
            PowerPhase::SinglePhase => self.max_current_single_phase_a,
            PowerPhase::ThreePhase => self.max_current_three_phase_a,
        }
    }
}
