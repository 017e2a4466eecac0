use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::CircuitBreakerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitStatus {
    /// Normal operation, calls pass through.
    Closed,
    /// Endpoint assumed down, calls are rejected without touching the network.
    Open,
    /// One probe call is in flight to test recovery.
    HalfOpen,
}

impl std::fmt::Display for CircuitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

#[derive(Debug)]
struct EndpointCircuitState {
    status: CircuitStatus,
    consecutive_failures: u32,
    last_failure_at: Option<DateTime<Utc>>,
    next_retry_at: Option<Instant>,
}

impl EndpointCircuitState {
    fn closed() -> Self {
        Self {
            status: CircuitStatus::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            next_retry_at: None,
        }
    }
}

/// Reporting view of one endpoint's circuit, for status surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointCircuitSnapshot {
    pub endpoint: String,
    pub status: CircuitStatus,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub retry_in_secs: Option<u64>,
}

/// Per-endpoint failure tracker.
///
/// States are created lazily on first failure and live for the process
/// lifetime only; failure patterns are cheap to re-learn after a restart.
/// Owned by the app context, never a module-level singleton.
#[derive(Debug)]
pub struct CircuitBreaker {
    endpoints: HashMap<String, EndpointCircuitState>,
    failure_threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            endpoints: HashMap::new(),
            failure_threshold,
            reset_timeout,
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(
            config.failure_threshold,
            Duration::from_secs(config.reset_timeout_secs),
        )
    }

    /// Whether calls to `endpoint` should be rejected right now.
    ///
    /// An expired Open circuit self-transitions to HalfOpen and returns false
    /// exactly once, admitting a single probe call; further checks return true
    /// until the probe outcome is recorded.
    pub fn is_open(&mut self, endpoint: &str, now: Instant) -> bool {
        let Some(state) = self.endpoints.get_mut(endpoint) else {
            return false;
        };

        match state.status {
            CircuitStatus::Closed => false,
            CircuitStatus::HalfOpen => true,
            CircuitStatus::Open => {
                let due = state.next_retry_at.is_none_or(|retry_at| now >= retry_at);
                if due {
                    state.status = CircuitStatus::HalfOpen;
                    log::info!("circuit_half_open endpoint={}", endpoint);
                    false
                } else {
                    true
                }
            }
        }
    }

    pub fn record_success(&mut self, endpoint: &str) {
        let Some(state) = self.endpoints.get_mut(endpoint) else {
            return;
        };

        if state.status != CircuitStatus::Closed || state.consecutive_failures > 0 {
            log::info!(
                "circuit_closed endpoint={} previous_status={}",
                endpoint,
                state.status
            );
        }
        *state = EndpointCircuitState::closed();
    }

    pub fn record_failure(&mut self, endpoint: &str, now: Instant) {
        let state = self
            .endpoints
            .entry(endpoint.to_string())
            .or_insert_with(EndpointCircuitState::closed);

        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_failure_at = Some(Utc::now());

        let should_open = match state.status {
            // A failed probe reopens immediately.
            CircuitStatus::HalfOpen => true,
            CircuitStatus::Closed => state.consecutive_failures >= self.failure_threshold,
            CircuitStatus::Open => false,
        };

        if should_open {
            state.status = CircuitStatus::Open;
            state.next_retry_at = Some(now + self.reset_timeout);
            log::warn!(
                "circuit_opened endpoint={} consecutive_failures={} retry_after_secs={}",
                endpoint,
                state.consecutive_failures,
                self.reset_timeout.as_secs()
            );
        }
    }

    pub fn snapshot(&self, now: Instant) -> Vec<EndpointCircuitSnapshot> {
        self.endpoints
            .iter()
            .map(|(endpoint, state)| EndpointCircuitSnapshot {
                endpoint: endpoint.clone(),
                status: state.status,
                consecutive_failures: state.consecutive_failures,
                last_failure_at: state.last_failure_at,
                retry_in_secs: state
                    .next_retry_at
                    .filter(|_| state.status == CircuitStatus::Open)
                    .map(|retry_at| retry_at.saturating_duration_since(now).as_secs()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{CircuitBreaker, CircuitStatus};

    const ENDPOINT: &str = "http://dcim.example/odata/racks";

    fn test_breaker() -> CircuitBreaker {
        CircuitBreaker::new(3, Duration::from_secs(30))
    }

    #[test]
    fn unknown_endpoints_start_closed() {
        let mut breaker = test_breaker();
        assert!(!breaker.is_open(ENDPOINT, Instant::now()));
        assert!(breaker.snapshot(Instant::now()).is_empty());
    }

    #[test]
    fn opens_after_threshold_and_admits_single_probe_after_timeout() {
        let mut breaker = test_breaker();
        let start = Instant::now();

        breaker.record_failure(ENDPOINT, start);
        breaker.record_failure(ENDPOINT, start);
        assert!(!breaker.is_open(ENDPOINT, start));

        breaker.record_failure(ENDPOINT, start);
        assert!(breaker.is_open(ENDPOINT, start));
        assert!(breaker.is_open(ENDPOINT, start + Duration::from_secs(29)));

        // Timeout elapsed: exactly one probe is admitted.
        assert!(!breaker.is_open(ENDPOINT, start + Duration::from_secs(30)));
        assert!(breaker.is_open(ENDPOINT, start + Duration::from_secs(30)));
    }

    #[test]
    fn failed_probe_reopens_with_fresh_timer() {
        let mut breaker = test_breaker();
        let start = Instant::now();

        for _ in 0..3 {
            breaker.record_failure(ENDPOINT, start);
        }
        let probe_at = start + Duration::from_secs(30);
        assert!(!breaker.is_open(ENDPOINT, probe_at));

        breaker.record_failure(ENDPOINT, probe_at);
        assert!(breaker.is_open(ENDPOINT, probe_at + Duration::from_secs(29)));
        assert!(!breaker.is_open(ENDPOINT, probe_at + Duration::from_secs(30)));
    }

    #[test]
    fn success_resets_from_any_state() {
        let mut breaker = test_breaker();
        let start = Instant::now();

        for _ in 0..3 {
            breaker.record_failure(ENDPOINT, start);
        }
        assert!(breaker.is_open(ENDPOINT, start));

        breaker.record_success(ENDPOINT);
        assert!(!breaker.is_open(ENDPOINT, start));

        let snapshot = breaker.snapshot(start);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].status, CircuitStatus::Closed);
        assert_eq!(snapshot[0].consecutive_failures, 0);
    }

    #[test]
    fn successful_probe_closes_the_circuit() {
        let mut breaker = test_breaker();
        let start = Instant::now();

        for _ in 0..3 {
            breaker.record_failure(ENDPOINT, start);
        }
        let probe_at = start + Duration::from_secs(31);
        assert!(!breaker.is_open(ENDPOINT, probe_at));

        breaker.record_success(ENDPOINT);
        assert!(!breaker.is_open(ENDPOINT, probe_at));
        // Counter restarted: reopening takes a full threshold again.
        breaker.record_failure(ENDPOINT, probe_at);
        assert!(!breaker.is_open(ENDPOINT, probe_at));
    }
}
