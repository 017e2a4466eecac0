use serde::Deserialize;

use super::defaults::*;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: Api,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default)]
    pub monitor: Monitor,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub thresholds: ThresholdDefaults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub racks_url: String,
    pub sensors_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_api_retries")]
    pub retries: u32,
    #[serde(default = "default_api_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    #[serde(default = "default_breaker_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_breaker_reset_timeout_secs")]
    pub reset_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Monitor {
    #[serde(default = "default_monitor_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_use_mock_on_fail")]
    pub use_mock_on_fail: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_enabled")]
    pub enabled: bool,
    #[serde(default = "default_store_path")]
    pub path: String,
}

/// Compiled-in threshold fallback, used when the store has no threshold rows.
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdDefaults {
    #[serde(default = "default_min_temp")]
    pub min_temp: f64,
    #[serde(default = "default_max_temp")]
    pub max_temp: f64,
    #[serde(default = "default_min_humidity")]
    pub min_humidity: f64,
    #[serde(default = "default_max_humidity")]
    pub max_humidity: f64,
    #[serde(default = "default_max_current_single_phase_a")]
    pub max_current_single_phase_a: f64,
    #[serde(default = "default_max_current_three_phase_a")]
    pub max_current_three_phase_a: f64,
}
