//! Direct HTTP fetch adapter.
//!
//! Issues a plain GET with a realistic desktop-browser User-Agent and
//! Accept headers, follows redirects, and enforces a hard 30-second
//! timeout. The cheapest rung of the fallback ladder: no rendering, no
//! paid service, so it runs first unless the caller prefers otherwise.

use std::sync::Arc;
use std::time::Instant;

use log::debug;

use crate::config::{ACCEPT_HEADER, HTTP_FETCH_TIMEOUT};
use crate::fetch::{build_result, ResponseParts};
use crate::models::{FetchResult, ScrapingMethod};

/// Fetches URLs with a direct HTTP GET.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Arc<reqwest::Client>,
}

impl HttpFetcher {
    pub fn new(client: Arc<reqwest::Client>) -> Self {
        Self { client }
    }

    /// Fetches `url` directly.
    ///
    /// Never returns an error: timeouts, transport failures, and blocked
    /// responses all come back as a `FetchResult` with `success = false`.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let start = Instant::now();
        debug!("http_fetch: GET {url}");

        let attempt = async {
            let response = self
                .client
                .get(url)
                .header(reqwest::header::ACCEPT, ACCEPT_HEADER)
                .send()
                .await?;

            let status = response.status().as_u16();
            let final_url = response.url().to_string();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string());
            let body = response.text().await.unwrap_or_default();
            Ok::<_, reqwest::Error>((status, final_url, content_type, body))
        };

        match tokio::time::timeout(HTTP_FETCH_TIMEOUT, attempt).await {
            Ok(Ok((status, final_url, content_type, body))) => build_result(ResponseParts {
                url,
                final_url,
                status_code: Some(status),
                content_type,
                body: &body,
                method: ScrapingMethod::HttpFetch,
                duration_ms: start.elapsed().as_millis() as u64,
                rendered: false,
            }),
            Ok(Err(e)) => {
                debug!("http_fetch: request error for {url}: {e}");
                FetchResult::failure(
                    url,
                    ScrapingMethod::HttpFetch,
                    e.to_string(),
                    start.elapsed().as_millis() as u64,
                )
            }
            Err(_) => FetchResult::failure(
                url,
                ScrapingMethod::HttpFetch,
                format!(
                    "Request timeout after {} seconds",
                    HTTP_FETCH_TIMEOUT.as_secs()
                ),
                start.elapsed().as_millis() as u64,
            ),
        }
    }
}
