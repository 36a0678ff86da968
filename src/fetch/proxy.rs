//! Proxy-rendering service adapter.
//!
//! Second rung of the fallback ladder: the service loads the page in a real
//! browser behind a rotating proxy pool and returns the rendered HTML,
//! which resolves Cloudflare challenges and client-side rendering that
//! defeat a direct GET. Paid and rate-limited, so it only runs when the
//! direct fetch was escalated past.

use std::sync::Arc;
use std::time::Instant;

use log::debug;

use crate::config::{ServiceKeys, DEFAULT_PROXY_BASE_URL, SERVICE_TIMEOUT_MS};
use crate::fetch::{build_result, ResponseParts};
use crate::models::{FetchResult, ScrapingMethod};

/// Margin added on top of the service-side timeout before the client
/// itself gives up, in milliseconds.
const CLIENT_TIMEOUT_MARGIN_MS: u64 = 10_000;

/// Configuration for the proxy-rendering service.
///
/// A closed struct rather than a key-value bag so that every supported
/// service parameter is visible here.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// API key; `None` disables the adapter entirely.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Ask the service to execute JavaScript before returning the body.
    pub render_js: bool,
    /// Route through the premium residential proxy pool.
    pub premium_proxy: bool,
    /// Two-letter country code to geolocate the request from.
    pub country_code: Option<String>,
    /// CSS selector the service should wait for before snapshotting.
    pub wait_for_selector: Option<String>,
    /// Service-side timeout in milliseconds.
    pub timeout_ms: u64,
    /// Also capture a screenshot (returned out-of-band by the service).
    pub screenshot: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_PROXY_BASE_URL.to_string(),
            render_js: true,
            premium_proxy: false,
            country_code: None,
            wait_for_selector: None,
            timeout_ms: SERVICE_TIMEOUT_MS,
            screenshot: false,
        }
    }
}

impl ProxyConfig {
    /// Builds a config from environment-provided service keys.
    pub fn from_keys(keys: &ServiceKeys) -> Self {
        Self {
            api_key: keys.proxy_api_key.clone(),
            base_url: keys
                .proxy_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_PROXY_BASE_URL.to_string()),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Fetches URLs through the proxy-rendering service.
#[derive(Clone)]
pub struct ProxyFetcher {
    client: Arc<reqwest::Client>,
    config: ProxyConfig,
}

impl ProxyFetcher {
    pub fn new(client: Arc<reqwest::Client>, config: ProxyConfig) -> Self {
        Self { client, config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Fetches `url` through the rendering service.
    ///
    /// With no API key configured this fails immediately without a network
    /// call. A non-OK service response becomes a failed result carrying the
    /// service's status code. On success the body is treated as fully
    /// JS-rendered.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let start = Instant::now();

        let Some(api_key) = self.config.api_key.as_deref() else {
            return FetchResult::failure(
                url,
                ScrapingMethod::ProxyService,
                "Proxy rendering service not configured (missing API key)",
                0,
            );
        };

        debug!("proxy_service: rendering {url}");

        let mut query: Vec<(&str, String)> = vec![
            ("api_key", api_key.to_string()),
            ("url", url.to_string()),
            ("render_js", self.config.render_js.to_string()),
            ("timeout", self.config.timeout_ms.to_string()),
        ];
        if self.config.premium_proxy {
            query.push(("premium_proxy", "true".to_string()));
        }
        if let Some(country) = &self.config.country_code {
            query.push(("country_code", country.clone()));
        }
        if let Some(selector) = &self.config.wait_for_selector {
            query.push(("wait_for", selector.clone()));
        }
        if self.config.screenshot {
            query.push(("screenshot", "true".to_string()));
        }

        let client_timeout =
            std::time::Duration::from_millis(self.config.timeout_ms + CLIENT_TIMEOUT_MARGIN_MS);

        let attempt = async {
            let response = self
                .client
                .get(&self.config.base_url)
                .query(&query)
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Ok::<_, reqwest::Error>((status, body))
        };

        match tokio::time::timeout(client_timeout, attempt).await {
            Ok(Ok((status, body))) => {
                if !status.is_success() {
                    let mut result = FetchResult::failure(
                        url,
                        ScrapingMethod::ProxyService,
                        format!("Proxy rendering service returned HTTP {}", status.as_u16()),
                        start.elapsed().as_millis() as u64,
                    );
                    result.status_code = Some(status.as_u16());
                    return result;
                }
                build_result(ResponseParts {
                    url,
                    final_url: url.to_string(),
                    status_code: Some(status.as_u16()),
                    content_type: Some("text/html".to_string()),
                    body: &body,
                    method: ScrapingMethod::ProxyService,
                    duration_ms: start.elapsed().as_millis() as u64,
                    rendered: true,
                })
            }
            Ok(Err(e)) => FetchResult::failure(
                url,
                ScrapingMethod::ProxyService,
                e.to_string(),
                start.elapsed().as_millis() as u64,
            ),
            Err(_) => FetchResult::failure(
                url,
                ScrapingMethod::ProxyService,
                format!(
                    "Request timeout after {} seconds",
                    client_timeout.as_secs()
                ),
                start.elapsed().as_millis() as u64,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network_call() {
        let fetcher = ProxyFetcher::new(
            Arc::new(reqwest::Client::new()),
            ProxyConfig::default(),
        );
        assert!(!fetcher.is_configured());

        let result = fetcher.fetch("https://example.gov/bids").await;
        assert!(!result.success);
        assert_eq!(result.duration_ms, 0);
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .contains("missing API key"));
    }

    #[test]
    fn test_config_from_keys() {
        let keys = ServiceKeys {
            proxy_api_key: Some("k".to_string()),
            proxy_base_url: None,
            browser_api_key: None,
            browser_base_url: None,
        };
        let config = ProxyConfig::from_keys(&keys);
        assert!(config.is_configured());
        assert_eq!(config.base_url, DEFAULT_PROXY_BASE_URL);
        assert!(config.render_js);
        assert_eq!(config.timeout_ms, SERVICE_TIMEOUT_MS);
    }
}
