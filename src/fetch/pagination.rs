use serde_json::Value;
use tokio::time::{Duration, sleep};

use crate::config::Pagination;

use super::{FetchError, get_json, shape};

const PAGED_QUERY_TOKENS: &[&str] = &["$filter", "$select", "$expand", "$orderby", "$top", "$skip"];

/// Heuristic: does this URL look like a paged query-style API?
pub fn is_paged_url(url: &str) -> bool {
    if url.contains("/odata/") {
        return true;
    }

    let Some((_, query)) = url.split_once('?') else {
        return false;
    };
    let query = query.to_ascii_lowercase();

    query.split('&').any(|parameter| {
        let name = parameter.split('=').next().unwrap_or("");
        PAGED_QUERY_TOKENS.contains(&name)
            || matches!(
                name,
                "filter" | "select" | "expand" | "orderby" | "top" | "skip"
            )
    })
}

fn page_url(base: &str, skip: u32, top: u32) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}$skip={}&$top={}", base, separator, skip, top)
}

/// Walk a skip/top paged endpoint until the data runs out, a declared total is
/// reached, or the page cap is hit. A page-level error after at least one good
/// page yields the partial result instead of an error.
pub(super) async fn fetch_all_pages(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
    pagination: &Pagination,
) -> Result<Vec<Value>, FetchError> {
    let mut collected: Vec<Value> = Vec::new();
    let mut declared_total: Option<u64> = None;

    for page in 0..pagination.max_pages {
        if page > 0 {
            sleep(Duration::from_millis(pagination.page_delay_ms)).await;
        }

        let skip = page * pagination.page_size;
        let request_url = page_url(url, skip, pagination.page_size);

        let body = match get_json(client, &request_url, api_key).await {
            Ok(body) => body,
            Err(error) if !collected.is_empty() => {
                log::warn!(
                    "pagination_partial url={} page={} collected={} error={}",
                    url,
                    page,
                    collected.len(),
                    error
                );
                return Ok(collected);
            }
            Err(error) => return Err(error),
        };

        let Some(response) = shape::classify(body) else {
            if !collected.is_empty() {
                log::warn!(
                    "pagination_partial url={} page={} collected={} error=unclassifiable_page",
                    url,
                    page,
                    collected.len()
                );
                return Ok(collected);
            }
            return Err(FetchError::Shape {
                url: request_url,
                reason: "no record array in page".to_string(),
            });
        };

        if declared_total.is_none() {
            declared_total = response.declared_total();
        }

        let records = response.into_records();
        let page_len = records.len();
        collected.extend(records);

        if page_len < pagination.page_size as usize {
            break;
        }
        if let Some(total) = declared_total
            && collected.len() as u64 >= total
        {
            break;
        }
    }

    log::debug!("pagination_done url={} records={}", url, collected.len());
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::config::Pagination;
    use crate::fetch::testutil::{StubResponse, serve};

    use super::{fetch_all_pages, is_paged_url, page_url};

    fn fast_pagination(page_size: u32) -> Pagination {
        Pagination {
            page_size,
            max_pages: 20,
            page_delay_ms: 1,
        }
    }

    #[test]
    fn paged_url_heuristics() {
        assert!(is_paged_url("http://dcim/odata/racks"));
        assert!(is_paged_url("http://dcim/api/racks?$top=50"));
        assert!(is_paged_url("http://dcim/api/racks?filter=active"));
        assert!(is_paged_url("http://dcim/api/racks?site=a&skip=10"));
        assert!(!is_paged_url("http://dcim/api/racks"));
        assert!(!is_paged_url("http://dcim/api/racks?site=a"));
    }

    #[test]
    fn page_url_respects_existing_query() {
        assert_eq!(
            page_url("http://dcim/api/racks", 0, 50),
            "http://dcim/api/racks?$skip=0&$top=50"
        );
        assert_eq!(
            page_url("http://dcim/api/racks?site=a", 50, 50),
            "http://dcim/api/racks?site=a&$skip=50&$top=50"
        );
    }

    #[tokio::test]
    async fn short_page_ends_the_walk() {
        let page_one = json!([{"n": 1}, {"n": 2}]).to_string();
        let page_two = json!([{"n": 3}]).to_string();
        let server = serve(vec![StubResponse::ok(page_one), StubResponse::ok(page_two)]).await;

        let client = reqwest::Client::new();
        let records = fetch_all_pages(&client, &server.url, None, &fast_pagination(2))
            .await
            .expect("pagination succeeds");

        assert_eq!(records.len(), 3);
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn declared_total_stops_early() {
        let page = json!({"value": [{}, {}], "count": 2}).to_string();
        let server = serve(vec![StubResponse::ok(page)]).await;

        let client = reqwest::Client::new();
        let records = fetch_all_pages(&client, &server.url, None, &fast_pagination(2))
            .await
            .expect("pagination succeeds");

        assert_eq!(records.len(), 2);
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn never_exceeds_the_page_cap() {
        // Every page comes back full, so only the cap can stop the walk.
        let full_page = json!([{}, {}]).to_string();
        let server = serve(vec![StubResponse::ok(full_page)]).await;

        let client = reqwest::Client::new();
        let pagination = Pagination {
            page_size: 2,
            max_pages: 5,
            page_delay_ms: 1,
        };
        let records = fetch_all_pages(&client, &server.url, None, &pagination)
            .await
            .expect("pagination succeeds");

        assert_eq!(server.hits(), 5);
        assert_eq!(records.len(), 10);
    }

    #[tokio::test]
    async fn mid_walk_error_returns_partial_result() {
        let full_page = json!([{}, {}]).to_string();
        let server = serve(vec![StubResponse::ok(full_page), StubResponse::status(500)]).await;

        let client = reqwest::Client::new();
        let records = fetch_all_pages(&client, &server.url, None, &fast_pagination(2))
            .await
            .expect("partial success");

        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn first_page_error_propagates() {
        let server = serve(vec![StubResponse::status(503)]).await;

        let client = reqwest::Client::new();
        let result = fetch_all_pages(&client, &server.url, None, &fast_pagination(2)).await;
        assert!(result.is_err());
    }
}
