use super::schema::{CircuitBreakerConfig, Monitor, Pagination, StoreConfig, ThresholdDefaults};

pub(super) fn default_api_timeout_secs() -> u64 {
    10
}

pub(super) fn default_api_retries() -> u32 {
    3
}

pub(super) fn default_api_retry_delay_ms() -> u64 {
    1000
}

pub(super) fn default_breaker_failure_threshold() -> u32 {
    3
}

pub(super) fn default_breaker_reset_timeout_secs() -> u64 {
    30
}

pub(super) fn default_page_size() -> u32 {
    50
}

pub(super) fn default_max_pages() -> u32 {
    20
}

pub(super) fn default_page_delay_ms() -> u64 {
    300
}

pub(super) fn default_monitor_interval_secs() -> u64 {
    60
}

pub(super) fn default_use_mock_on_fail() -> bool {
    true
}

pub(super) fn default_store_enabled() -> bool {
    true
}

pub(super) fn default_store_path() -> String {
    "data/telemetry".to_string()
}

pub(super) fn default_min_temp() -> f64 {
    18.0
}

pub(super) fn default_max_temp() -> f64 {
    32.0
}

pub(super) fn default_min_humidity() -> f64 {
    30.0
}

pub(super) fn default_max_humidity() -> f64 {
    70.0
}

pub(super) fn default_max_current_single_phase_a() -> f64 {
    16.0
}

pub(super) fn default_max_current_three_phase_a() -> f64 {
    32.0
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_breaker_failure_threshold(),
            reset_timeout_secs: default_breaker_reset_timeout_secs(),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            page_delay_ms: default_page_delay_ms(),
        }
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            interval_secs: default_monitor_interval_secs(),
            use_mock_on_fail: default_use_mock_on_fail(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: default_store_enabled(),
            path: default_store_path(),
        }
    }
}

impl Default for ThresholdDefaults {
    fn default() -> Self {
        Self {
            min_temp: default_min_temp(),
            max_temp: default_max_temp(),
            min_humidity: default_min_humidity(),
            max_humidity: default_max_humidity(),
            max_current_single_phase_a: default_max_current_single_phase_a(),
            max_current_three_phase_a: default_max_current_three_phase_a(),
        }
    }
}
