use thiserror::Error;

use super::schema::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Validation(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("api.racks_url", &self.api.racks_url)?;
        validate_url("api.sensors_url", &self.api.sensors_url)?;
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "api.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.api.retry_delay_ms == 0 {
            return Err(ConfigError::Validation(
                "api.retry_delay_ms must be greater than 0".to_string(),
            ));
        }
        if let Some(key) = &self.api.api_key
            && key.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "api.api_key must not be empty when set".to_string(),
            ));
        }

        if self.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::Validation(
                "circuit_breaker.failure_threshold must be greater than 0".to_string(),
            ));
        }
        if self.circuit_breaker.reset_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "circuit_breaker.reset_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.pagination.page_size == 0 {
            return Err(ConfigError::Validation(
                "pagination.page_size must be greater than 0".to_string(),
            ));
        }
        if self.pagination.max_pages == 0 {
            return Err(ConfigError::Validation(
                "pagination.max_pages must be greater than 0".to_string(),
            ));
        }

        if self.monitor.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "monitor.interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.store.enabled && self.store.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "store.path must not be empty when store.enabled is true".to_string(),
            ));
        }

        if self.thresholds.min_temp >= self.thresholds.max_temp {
            return Err(ConfigError::Validation(
                "thresholds.min_temp must be below thresholds.max_temp".to_string(),
            ));
        }
        if self.thresholds.min_humidity >= self.thresholds.max_humidity {
            return Err(ConfigError::Validation(
                "thresholds.min_humidity must be below thresholds.max_humidity".to_string(),
            ));
        }
        validate_positive(
            "thresholds.max_current_single_phase_a",
            self.thresholds.max_current_single_phase_a,
        )?;
        validate_positive(
            "thresholds.max_current_three_phase_a",
            self.thresholds.max_current_three_phase_a,
        )?;

        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} must not be empty",
            field
        )));
    }
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{} must start with http:// or https://",
            field
        )));
    }
    Ok(())
}

fn validate_positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_nan() || value <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} must be a positive number",
            field
        )));
    }
    Ok(())
}
