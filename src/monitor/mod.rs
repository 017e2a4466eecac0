mod cycle;
mod evaluator;
mod records;
mod service;
mod status;

pub use service::{
    fetch_external_api, get_circuit_breaker_status, get_monitoring_status, get_rack_data,
    get_sensor_data, run_monitoring_cycle, start_monitoring, stop_monitoring,
};
pub use status::{CycleState, MonitorSnapshot};
