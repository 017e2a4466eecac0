mod defaults;
mod io;
mod schema;
mod validate;

pub use io::load_config;
#[allow(unused_imports)]
pub use schema::{
    Api, CircuitBreakerConfig, Config, Monitor, Pagination, StoreConfig, ThresholdDefaults,
};
pub use validate::ConfigError;
