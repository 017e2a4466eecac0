mod breaker;
mod pagination;
mod reachability;
mod resilient;
mod shape;
mod synthetic;

pub use breaker::{CircuitBreaker, CircuitStatus, EndpointCircuitSnapshot};
pub use pagination::is_paged_url;
pub use reachability::is_api_reachable;
pub use resilient::{FetchOptions, RemoteFetch, ResilientFetcher, RetryPolicy};
pub use synthetic::synthetic_records;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },
    #[error("{url} returned http status {status}")]
    Status { url: String, status: u16 },
    #[error("unusable response from {url}: {reason}")]
    Shape { url: String, reason: String },
    #[error("circuit open for {url}")]
    CircuitOpen { url: String },
    #[error("{source_name} fetch from {url} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        source_name: String,
        url: String,
        attempts: u32,
        last_error: String,
    },
}

/// One GET with bearer auth when configured. HTTP 530 is the upstream's
/// FTP-style auth failure; it gets its own log line but the caller retries it
/// like any other failure.
pub(crate) async fn get_json(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
) -> Result<Value, FetchError> {
    let mut request = client.get(url);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if status.as_u16() == 530 {
        log::warn!("upstream_auth_gateway_failure url={} status=530", url);
        return Err(FetchError::Status {
            url: url.to_string(),
            status: 530,
        });
    }
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::collections::VecDeque;
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    };

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    pub(crate) struct StubResponse {
        pub status: u16,
        pub body: String,
    }

    impl StubResponse {
        pub(crate) fn ok(body: impl Into<String>) -> Self {
            Self {
                status: 200,
                body: body.into(),
            }
        }

        pub(crate) fn status(status: u16) -> Self {
            Self {
                status,
                body: String::new(),
            }
        }
    }

    pub(crate) struct StubServer {
        pub url: String,
        hits: Arc<AtomicU32>,
    }

    impl StubServer {
        pub(crate) fn hits(&self) -> u32 {
            self.hits.load(Ordering::SeqCst)
        }
    }

    /// Minimal one-request-per-connection HTTP stub. Responses are served in
    /// order; the last one repeats once the queue is exhausted.
    pub(crate) async fn serve(responses: Vec<StubResponse>) -> StubServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let address = listener.local_addr().expect("stub address");
        let hits = Arc::new(AtomicU32::new(0));
        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));

        let hit_counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                hit_counter.fetch_add(1, Ordering::SeqCst);

                let mut buffer = Vec::new();
                let mut chunk = [0u8; 1024];
                let mut is_head = false;
                while let Ok(read) = socket.read(&mut chunk).await {
                    if read == 0 {
                        break;
                    }
                    buffer.extend_from_slice(&chunk[..read]);
                    if buffer.windows(4).any(|window| window == b"\r\n\r\n") {
                        is_head = buffer.starts_with(b"HEAD ");
                        break;
                    }
                }

                let response = {
                    let mut queue = queue.lock().expect("stub queue");
                    if queue.len() > 1 {
                        queue.pop_front()
                    } else {
                        queue.front().map(|last| StubResponse {
                            status: last.status,
                            body: last.body.clone(),
                        })
                    }
                };
                let Some(response) = response else {
                    return;
                };

                let body = if is_head { "" } else { response.body.as_str() };
                let payload = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(payload.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        StubServer {
            url: format!("http://{}", address),
            hits,
        }
    }
}
