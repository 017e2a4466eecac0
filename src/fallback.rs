use serde_json::Value;
use thiserror::Error;

use crate::fetch::{FetchOptions, RemoteFetch, synthetic_records};

#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("all data tiers failed for {source_name}: store={store_cause}; api={api_cause}")]
    AllTiersFailed {
        source_name: String,
        store_cause: String,
        api_cause: String,
    },
}

/// Three-tier read cascade: persistent store, then the upstream API, then
/// synthetic data. The first non-empty tier wins and no tier is tried twice
/// within one call. Every fall-through is logged with its reason so operators
/// can reconstruct where a response came from.
pub async fn get_data_with_fallback<F, Fut, R>(
    primary: F,
    fetcher: &R,
    api_url: &str,
    source_name: &str,
    options: &FetchOptions,
) -> Result<Vec<Value>, CascadeError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Vec<Value>>,
    R: RemoteFetch,
{
    let rows = primary().await;
    if !rows.is_empty() {
        log::debug!(
            "cascade_store_hit source={} rows={}",
            source_name,
            rows.len()
        );
        return Ok(rows);
    }

    // The store contract maps failures to empty results, so empty covers both.
    let store_cause = "store returned no rows".to_string();
    log::info!(
        "cascade_fallthrough source={} tier=store reason=empty next=api",
        source_name
    );

    // The cascade owns the synthetic tier; the API tier must fail loudly.
    let mut api_options = options.clone();
    api_options.use_mock_on_fail = false;

    let api_cause = match fetcher.fetch(api_url, source_name, &api_options).await {
        Ok(records) if !records.is_empty() => {
            log::info!(
                "cascade_api_hit source={} records={}",
                source_name,
                records.len()
            );
            return Ok(records);
        }
        Ok(_) => "api returned no records".to_string(),
        Err(error) => error.to_string(),
    };

    if options.use_mock_on_fail {
        log::warn!(
            "cascade_fallthrough source={} tier=api reason={} next=synthetic",
            source_name,
            api_cause
        );
        return Ok(synthetic_records(source_name));
    }

    log::error!(
        "cascade_exhausted source={} store_cause={} api_cause={}",
        source_name,
        store_cause,
        api_cause
    );
    Err(CascadeError::AllTiersFailed {
        source_name: source_name.to_string(),
        store_cause,
        api_cause,
    })
}
