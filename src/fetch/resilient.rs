use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Duration;

use crate::config::Config;

use super::{
    FetchError, breaker::CircuitBreaker, get_json, pagination, shape, synthetic::synthetic_records,
};

/// Per-call fetch policy.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub retries: u32,
    pub retry_delay: Duration,
    pub use_circuit_breaker: bool,
    pub use_mock_on_fail: bool,
    /// `None` auto-detects from the URL shape.
    pub paginate: Option<bool>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay: Duration::from_millis(1000),
            use_circuit_breaker: true,
            use_mock_on_fail: true,
            paginate: None,
        }
    }
}

impl FetchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            retries: config.api.retries,
            retry_delay: Duration::from_millis(config.api.retry_delay_ms),
            use_mock_on_fail: config.monitor.use_mock_on_fail,
            ..Self::default()
        }
    }
}

/// Exponential backoff policy, kept separate from the I/O loop so the
/// schedule is testable on its own.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            base_delay,
        }
    }

    /// Deterministic delay after `failed_attempts` failures:
    /// `base * 2^(failed_attempts - 1)`.
    pub fn backoff_delay(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Backoff plus up to 30% random jitter.
    pub fn jittered_delay(&self, failed_attempts: u32) -> Duration {
        let base = self.backoff_delay(failed_attempts);
        let jitter = rand::thread_rng().gen_range(0.0..0.3);
        base + base.mul_f64(jitter)
    }
}

/// Seam between consumers (cascade, monitoring cycle) and the real HTTP
/// fetcher, so both can run against a canned fetcher in tests.
pub trait RemoteFetch {
    async fn fetch(
        &self,
        url: &str,
        source_name: &str,
        options: &FetchOptions,
    ) -> Result<Vec<Value>, FetchError>;
}

pub struct ResilientFetcher {
    client: reqwest::Client,
    api_key: Option<String>,
    pagination: crate::config::Pagination,
    breaker: Arc<Mutex<CircuitBreaker>>,
}

impl ResilientFetcher {
    pub fn new(
        client: reqwest::Client,
        config: &Config,
        breaker: Arc<Mutex<CircuitBreaker>>,
    ) -> Self {
        Self {
            client,
            api_key: config.api.api_key.clone(),
            pagination: config.pagination.clone(),
            breaker,
        }
    }

    async fn attempt(&self, url: &str, paged: bool) -> Result<Vec<Value>, FetchError> {
        if paged {
            return pagination::fetch_all_pages(
                &self.client,
                url,
                self.api_key.as_deref(),
                &self.pagination,
            )
            .await;
        }

        let body = get_json(&self.client, url, self.api_key.as_deref()).await?;
        shape::normalize_flat(body).map_err(|reason| FetchError::Shape {
            url: url.to_string(),
            reason,
        })
    }
}

impl RemoteFetch for ResilientFetcher {
    async fn fetch(
        &self,
        url: &str,
        source_name: &str,
        options: &FetchOptions,
    ) -> Result<Vec<Value>, FetchError> {
        if options.use_circuit_breaker {
            let mut breaker = self.breaker.lock().await;
            if breaker.is_open(url, Instant::now()) {
                log::warn!("fetch_skipped_circuit_open source={} url={}", source_name, url);
                if options.use_mock_on_fail {
                    return Ok(synthetic_records(source_name));
                }
                return Err(FetchError::CircuitOpen {
                    url: url.to_string(),
                });
            }
        }

        let paged = options.paginate.unwrap_or_else(|| pagination::is_paged_url(url));
        let policy = RetryPolicy::new(options.retries, options.retry_delay);
        let mut last_error: Option<FetchError> = None;

        for attempt in 1..=policy.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(policy.jittered_delay(attempt - 1)).await;
            }

            match self.attempt(url, paged).await {
                Ok(records) => {
                    if options.use_circuit_breaker {
                        self.breaker.lock().await.record_success(url);
                    }
                    log::debug!(
                        "fetch_ok source={} url={} attempt={} records={}",
                        source_name,
                        url,
                        attempt,
                        records.len()
                    );
                    return Ok(records);
                }
                Err(error) => {
                    log::warn!(
                        "fetch_attempt_failed source={} url={} attempt={}/{} error={}",
                        source_name,
                        url,
                        attempt,
                        policy.max_attempts,
                        error
                    );
                    if options.use_circuit_breaker {
                        self.breaker.lock().await.record_failure(url, Instant::now());
                    }
                    last_error = Some(error);
                }
            }
        }

        let last_error = last_error
            .map(|error| error.to_string())
            .unwrap_or_else(|| "no attempt made".to_string());

        if options.use_mock_on_fail {
            log::warn!(
                "fetch_exhausted_using_synthetic source={} url={} attempts={}",
                source_name,
                url,
                policy.max_attempts
            );
            return Ok(synthetic_records(source_name));
        }

        Err(FetchError::Exhausted {
            source_name: source_name.to_string(),
            url: url.to_string(),
            attempts: policy.max_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::Mutex;

    use crate::fetch::breaker::CircuitBreaker;
    use crate::fetch::testutil::{StubResponse, serve};
    use crate::fetch::FetchError;

    use super::{FetchOptions, RemoteFetch, ResilientFetcher, RetryPolicy};

    fn test_fetcher(breaker: Arc<Mutex<CircuitBreaker>>) -> ResilientFetcher {
        ResilientFetcher {
            client: reqwest::Client::new(),
            api_key: None,
            pagination: crate::config::Pagination {
                page_size: 50,
                max_pages: 20,
                page_delay_ms: 1,
            },
            breaker,
        }
    }

    fn fast_options(retries: u32) -> FetchOptions {
        FetchOptions {
            retries,
            retry_delay: Duration::from_millis(1),
            use_circuit_breaker: true,
            use_mock_on_fail: false,
            paginate: Some(false),
        }
    }

    fn test_breaker() -> Arc<Mutex<CircuitBreaker>> {
        Arc::new(Mutex::new(CircuitBreaker::new(3, Duration::from_secs(30))))
    }

    #[test]
    fn backoff_schedule_doubles_per_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(400));

        for failed in 1..4 {
            let jittered = policy.jittered_delay(failed);
            let base = policy.backoff_delay(failed);
            assert!(jittered >= base);
            assert!(jittered <= base + base.mul_f64(0.3));
        }
    }

    #[tokio::test]
    async fn accepts_both_normalized_shapes() {
        let bare = serve(vec![StubResponse::ok(json!([{"a": 1}]).to_string())]).await;
        let legacy = serve(vec![StubResponse::ok(
            json!({"status": "Success", "data": [{"a": 2}]}).to_string(),
        )])
        .await;

        let fetcher = test_fetcher(test_breaker());
        let options = fast_options(0);

        let from_bare = fetcher.fetch(&bare.url, "racks", &options).await.expect("bare");
        assert_eq!(from_bare, vec![json!({"a": 1})]);

        let from_legacy = fetcher
            .fetch(&legacy.url, "racks", &options)
            .await
            .expect("legacy");
        assert_eq!(from_legacy, vec![json!({"a": 2})]);
    }

    #[tokio::test]
    async fn fails_after_exactly_one_plus_retries_attempts() {
        let server = serve(vec![StubResponse::status(500)]).await;

        let fetcher = test_fetcher(test_breaker());
        let result = fetcher.fetch(&server.url, "racks", &fast_options(2)).await;

        assert!(matches!(result, Err(FetchError::Exhausted { attempts: 3, .. })));
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn unexpected_shape_counts_as_attempt_failure() {
        let server = serve(vec![StubResponse::ok(
            json!({"status": "Error", "data": []}).to_string(),
        )])
        .await;

        let fetcher = test_fetcher(test_breaker());
        let result = fetcher.fetch(&server.url, "racks", &fast_options(1)).await;

        assert!(result.is_err());
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn open_circuit_skips_the_network_entirely() {
        let server = serve(vec![StubResponse::status(500)]).await;
        let breaker = test_breaker();
        let fetcher = test_fetcher(breaker.clone());

        // Trip the breaker: 3 attempts, 3 recorded failures.
        let _ = fetcher.fetch(&server.url, "racks", &fast_options(2)).await;
        assert_eq!(server.hits(), 3);

        let rejected = fetcher.fetch(&server.url, "racks", &fast_options(2)).await;
        assert!(matches!(rejected, Err(FetchError::CircuitOpen { .. })));
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn open_circuit_with_mock_yields_synthetic_records() {
        let server = serve(vec![StubResponse::status(500)]).await;
        let breaker = test_breaker();
        let fetcher = test_fetcher(breaker.clone());

        let _ = fetcher.fetch(&server.url, "racks", &fast_options(2)).await;

        let mut options = fast_options(2);
        options.use_mock_on_fail = true;
        let records = fetcher
            .fetch(&server.url, "racks", &options)
            .await
            .expect("synthetic records");
        assert!(!records.is_empty());
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn exhaustion_with_mock_yields_synthetic_records() {
        let server = serve(vec![StubResponse::status(500)]).await;
        let fetcher = test_fetcher(test_breaker());

        let mut options = fast_options(1);
        options.use_mock_on_fail = true;
        let records = fetcher
            .fetch(&server.url, "sensor-readings", &options)
            .await
            .expect("synthetic records");

        assert!(!records.is_empty());
        assert!(records[0].get("temperature_c").is_some());
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn success_closes_a_half_open_circuit() {
        let server = serve(vec![
            StubResponse::status(500),
            StubResponse::status(500),
            StubResponse::status(500),
            StubResponse::ok(json!([{"a": 1}]).to_string()),
        ])
        .await;
        let breaker = test_breaker();
        let fetcher = test_fetcher(breaker.clone());

        let _ = fetcher.fetch(&server.url, "racks", &fast_options(2)).await;
        assert_eq!(server.hits(), 3);

        // Force the open window to lapse so the next call is the probe.
        {
            use std::time::Instant;
            let mut guard = breaker.lock().await;
            *guard = CircuitBreaker::new(3, Duration::from_secs(0));
            guard.record_failure(&server.url, Instant::now());
            guard.record_failure(&server.url, Instant::now());
            guard.record_failure(&server.url, Instant::now());
        }

        let records = fetcher
            .fetch(&server.url, "racks", &fast_options(0))
            .await
            .expect("probe succeeds");
        assert_eq!(records.len(), 1);

        let snapshot = breaker.lock().await.snapshot(std::time::Instant::now());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].consecutive_failures, 0);
    }
}
