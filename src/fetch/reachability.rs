use tokio::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Lightweight reachability probe: HEAD first, GET as a fallback for
/// upstreams that reject HEAD. Any HTTP response counts as reachable; only
/// transport-level failures do not.
pub async fn is_api_reachable(client: &reqwest::Client, url: &str) -> bool {
    match client.head(url).timeout(PROBE_TIMEOUT).send().await {
        Ok(_) => true,
        Err(head_error) => {
            log::debug!("head_probe_failed url={} error={}", url, head_error);
            match client.get(url).timeout(PROBE_TIMEOUT).send().await {
                Ok(_) => true,
                Err(get_error) => {
                    log::debug!("get_probe_failed url={} error={}", url, get_error);
                    false
                }
            }
        }
    }
}
