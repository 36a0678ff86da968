//! Core data model for fetch attempts and fallback orchestration.
//!
//! A [`FetchResult`] is the outcome of one adapter attempt against one URL.
//! It is immutable once produced: adapters build it, the orchestrator reads
//! it to decide whether to escalate, and callers consume it. Failures are
//! encoded as data (`success = false` plus an error string), never as `Err`.

use serde::Serialize;

use crate::classifier::PageType;

/// One concrete strategy for retrieving a URL's rendered content.
///
/// The fixed priority order used by the fallback orchestrator is
/// `HttpFetch` → `ProxyService` → `BrowserService`. `FrontendBrowser` is
/// declared for persistence and wire compatibility but is never dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ScrapingMethod {
    HttpFetch,
    ProxyService,
    BrowserService,
    #[value(skip)]
    FrontendBrowser,
}

impl ScrapingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapingMethod::HttpFetch => "http_fetch",
            ScrapingMethod::ProxyService => "proxy_service",
            ScrapingMethod::BrowserService => "browser_service",
            ScrapingMethod::FrontendBrowser => "frontend_browser",
        }
    }
}

impl std::fmt::Display for ScrapingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier verdicts attached to a [`FetchResult`].
///
/// Created fresh per attempt; never shared across attempts. The flags drive
/// the orchestrator's escalation decision, and `warnings` carries one
/// human-readable line per positive detector.
#[derive(Debug, Clone, Serialize)]
pub struct FetchMetadata {
    pub blocked: bool,
    pub requires_javascript: bool,
    pub requires_auth: bool,
    pub cloudflare_detected: bool,
    pub captcha_detected: bool,
    pub raw_html_length: usize,
    pub extracted_text_length: usize,
    pub page_type: PageType,
    pub warnings: Vec<String>,
}

impl FetchMetadata {
    /// Metadata for an attempt that produced no body (network error,
    /// timeout, missing API key). Nothing was observed, so every detector
    /// is negative and the page type is unknown.
    pub fn empty() -> Self {
        Self {
            blocked: false,
            requires_javascript: false,
            requires_auth: false,
            cloudflare_detected: false,
            captcha_detected: false,
            raw_html_length: 0,
            extracted_text_length: 0,
            page_type: PageType::Unknown,
            warnings: Vec::new(),
        }
    }
}

/// Outcome of one adapter attempt against one URL.
///
/// Invariant: `success` is true only if the response was not
/// blocked/challenged and the extracted text exceeds
/// [`crate::config::MIN_EXTRACTED_TEXT_LENGTH`].
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    /// URL as requested.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code, when a response was received at all.
    pub status_code: Option<u16>,
    /// Content-Type header of the response.
    pub content_type: Option<String>,
    /// Raw HTML, trimmed to [`crate::config::MAX_RAW_HTML_LENGTH`].
    pub html: String,
    /// Extracted plain text, trimmed to
    /// [`crate::config::MAX_EXTRACTED_TEXT_LENGTH`].
    pub extracted_text: String,
    /// Page title, when one was present.
    pub title: Option<String>,
    pub method: ScrapingMethod,
    /// Wall-clock duration of the attempt in milliseconds.
    pub duration_ms: u64,
    pub success: bool,
    pub error: Option<String>,
    pub metadata: FetchMetadata,
}

impl FetchResult {
    /// Builds a failed result for an attempt that never produced a body.
    pub fn failure(
        url: &str,
        method: ScrapingMethod,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            url: url.to_string(),
            final_url: url.to_string(),
            status_code: None,
            content_type: None,
            html: String::new(),
            extracted_text: String::new(),
            title: None,
            method,
            duration_ms,
            success: false,
            error: Some(error.into()),
            metadata: FetchMetadata::empty(),
        }
    }
}

/// Outcome of the fallback orchestrator for one URL: the winning (or last)
/// fetch result plus which methods were tried to get there.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyResult {
    pub result: FetchResult,
    /// Methods attempted, in order.
    pub methods_attempted: Vec<ScrapingMethod>,
    /// Whether any method beyond the first was tried.
    pub fallback_used: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scraping_method_string_forms() {
        assert_eq!(ScrapingMethod::HttpFetch.as_str(), "http_fetch");
        assert_eq!(ScrapingMethod::ProxyService.as_str(), "proxy_service");
        assert_eq!(ScrapingMethod::BrowserService.as_str(), "browser_service");
        assert_eq!(ScrapingMethod::FrontendBrowser.as_str(), "frontend_browser");
    }

    #[test]
    fn test_failure_result_has_empty_metadata() {
        let result = FetchResult::failure(
            "https://example.gov",
            ScrapingMethod::HttpFetch,
            "connection refused",
            120,
        );
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("connection refused"));
        assert_eq!(result.metadata.extracted_text_length, 0);
        assert!(!result.metadata.blocked);
        assert_eq!(result.metadata.page_type, PageType::Unknown);
    }
}
