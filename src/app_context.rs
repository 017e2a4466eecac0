use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::config::Config;
use crate::fetch::{CircuitBreaker, ResilientFetcher};
use crate::monitor::CycleState;
use crate::store::SledTelemetryStore;

#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub client: reqwest::Client,
    pub store: Option<SledTelemetryStore>,
    pub breaker: Arc<Mutex<CircuitBreaker>>,
    pub cycle_state: Arc<Mutex<CycleState>>,
    pub(crate) monitor_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    pub(crate) monitor_stop: Arc<Notify>,
}

impl AppContext {
    pub fn new(config: Config, store: Option<SledTelemetryStore>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .build()?;

        let breaker = Arc::new(Mutex::new(CircuitBreaker::from_config(
            &config.circuit_breaker,
        )));

        Ok(Self {
            config,
            client,
            store,
            breaker,
            cycle_state: Arc::new(Mutex::new(CycleState::default())),
            monitor_task: Arc::new(Mutex::new(None)),
            monitor_stop: Arc::new(Notify::new()),
        })
    }

    pub fn fetcher(&self) -> ResilientFetcher {
        ResilientFetcher::new(self.client.clone(), &self.config, self.breaker.clone())
    }
}
