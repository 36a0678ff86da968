//! Headless-browser service adapter.
//!
//! Last rung of the fallback ladder: a full managed Chrome session with
//! stealth patches and ad blocking. The most capable and most expensive
//! strategy, reserved for pages the proxy-rendering service could not
//! crack.

use std::sync::Arc;
use std::time::Instant;

use log::debug;
use serde_json::json;

use crate::config::{ServiceKeys, DEFAULT_BROWSER_BASE_URL, SERVICE_TIMEOUT_MS};
use crate::fetch::{build_result, ResponseParts};
use crate::models::{FetchResult, ScrapingMethod};

/// Margin added on top of the service-side timeout before the client
/// itself gives up, in milliseconds.
const CLIENT_TIMEOUT_MARGIN_MS: u64 = 10_000;

/// Page-load milestone the browser waits for before returning content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitUntil {
    Load,
    DomContentLoaded,
    NetworkIdle0,
    NetworkIdle2,
}

impl WaitUntil {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle0 => "networkidle0",
            WaitUntil::NetworkIdle2 => "networkidle2",
        }
    }
}

/// Configuration for the headless-browser service.
#[derive(Clone, Debug)]
pub struct BrowserConfig {
    /// API token; `None` disables the adapter entirely.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Load milestone to wait for before snapshotting the DOM.
    pub wait_until: WaitUntil,
    /// Apply bot-detection evasion patches.
    pub stealth: bool,
    /// Block ad and tracker requests to speed up the load.
    pub block_ads: bool,
    /// Navigation timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BROWSER_BASE_URL.to_string(),
            wait_until: WaitUntil::NetworkIdle2,
            stealth: true,
            block_ads: true,
            timeout_ms: SERVICE_TIMEOUT_MS,
        }
    }
}

impl BrowserConfig {
    /// Builds a config from environment-provided service keys.
    pub fn from_keys(keys: &ServiceKeys) -> Self {
        Self {
            api_key: keys.browser_api_key.clone(),
            base_url: keys
                .browser_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BROWSER_BASE_URL.to_string()),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Fetches URLs through the headless-browser service.
#[derive(Clone)]
pub struct BrowserFetcher {
    client: Arc<reqwest::Client>,
    config: BrowserConfig,
}

impl BrowserFetcher {
    pub fn new(client: Arc<reqwest::Client>, config: BrowserConfig) -> Self {
        Self { client, config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Fetches `url` through the browser service's content endpoint.
    ///
    /// With no API token configured this fails immediately without a
    /// network call. The response body is the rendered DOM, so the same
    /// rendered-body post-processing as the proxy adapter applies.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let start = Instant::now();

        let Some(api_key) = self.config.api_key.as_deref() else {
            return FetchResult::failure(
                url,
                ScrapingMethod::BrowserService,
                "Browser service not configured (missing API key)",
                0,
            );
        };

        debug!(
            "browser_service: content for {url} (wait_until={})",
            self.config.wait_until.as_str()
        );

        let endpoint = format!("{}/content", self.config.base_url.trim_end_matches('/'));
        let mut query: Vec<(&str, String)> = vec![("token", api_key.to_string())];
        if self.config.stealth {
            query.push(("stealth", "true".to_string()));
        }
        if self.config.block_ads {
            query.push(("blockAds", "true".to_string()));
        }

        let payload = json!({
            "url": url,
            "gotoOptions": {
                "waitUntil": self.config.wait_until.as_str(),
                "timeout": self.config.timeout_ms,
            },
        });

        let client_timeout =
            std::time::Duration::from_millis(self.config.timeout_ms + CLIENT_TIMEOUT_MARGIN_MS);

        let attempt = async {
            let response = self
                .client
                .post(&endpoint)
                .query(&query)
                .json(&payload)
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
                        ScrapingMethod::BrowserService,
                        format!("Browser service returned HTTP {}", status.as_u16()),
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
                    method: ScrapingMethod::BrowserService,
                    duration_ms: start.elapsed().as_millis() as u64,
                    rendered: true,
                })
            }
            Ok(Err(e)) => FetchResult::failure(
                url,
                ScrapingMethod::BrowserService,
                e.to_string(),
                start.elapsed().as_millis() as u64,
            ),
            Err(_) => FetchResult::failure(
                url,
                ScrapingMethod::BrowserService,
                format!(
                    "Request timeout after {} seconds",
                    client_timeout.as_secs()
                ),
                start.elapsed().as_millis() as u64,
            ),
        }
    }
}
