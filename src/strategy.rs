//! Fallback orchestrator: tries fetch adapters in priority order until one
//! produces a usable page.
//!
//! The escalation policy is the crux of the subsystem: it trades cost (the
//! proxy and browser services are paid and rate-limited) against
//! completeness. A direct HTTP fetch runs first; Cloudflare challenges,
//! CAPTCHAs, auth walls, client-rendered shells, and server errors escalate
//! to the next adapter. A 404 never escalates: the page is definitively
//! gone and a heavier adapter would only burn paid capacity.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};

use crate::config::{DEFAULT_MAX_RETRIES, MIN_EXTRACTED_TEXT_LENGTH};
use crate::error_handling::{ErrorStats, ErrorType};
use crate::fetch::{BrowserFetcher, HttpFetcher, ProxyFetcher};
use crate::models::{FetchResult, ScrapingMethod, StrategyResult};

/// Fixed escalation order when no preference is given.
const METHOD_PRIORITY: &[ScrapingMethod] = &[
    ScrapingMethod::HttpFetch,
    ScrapingMethod::ProxyService,
    ScrapingMethod::BrowserService,
];

/// Per-call options for [`FetchEngine::fetch_with_fallback`].
#[derive(Clone, Debug)]
pub struct FetchOptions {
    /// Method to try first; the rest follow in fixed priority order.
    pub preferred_method: Option<ScrapingMethod>,
    /// When false, the first method's failure is final.
    pub enable_fallback: bool,
    /// Attempts per method before escalating.
    pub max_retries: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            preferred_method: None,
            enable_fallback: true,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Owns the three fetch adapters and applies the escalation policy.
///
/// Constructed once at startup with explicitly injected adapters; service
/// adapters without an API key stay constructed but are skipped in method
/// ordering.
#[derive(Clone)]
pub struct FetchEngine {
    http: HttpFetcher,
    proxy: ProxyFetcher,
    browser: BrowserFetcher,
    error_stats: Arc<ErrorStats>,
}

impl FetchEngine {
    pub fn new(
        http: HttpFetcher,
        proxy: ProxyFetcher,
        browser: BrowserFetcher,
        error_stats: Arc<ErrorStats>,
    ) -> Self {
        Self {
            http,
            proxy,
            browser,
            error_stats,
        }
    }

    /// Returns true when `method` can actually be dispatched.
    fn is_available(&self, method: ScrapingMethod) -> bool {
        match method {
            ScrapingMethod::HttpFetch => true,
            ScrapingMethod::ProxyService => self.proxy.is_configured(),
            ScrapingMethod::BrowserService => self.browser.is_configured(),
            // Reserved for a client-side adapter; never dispatched here.
            ScrapingMethod::FrontendBrowser => false,
        }
    }

    /// Computes the method order for one scrape: the preferred method
    /// first, then the remaining methods in fixed priority, skipping any
    /// service whose API key is not configured.
    pub fn method_order(&self, preferred: Option<ScrapingMethod>) -> Vec<ScrapingMethod> {
        let mut order = Vec::with_capacity(METHOD_PRIORITY.len());
        if let Some(method) = preferred {
            if self.is_available(method) {
                order.push(method);
            }
        }
        for &method in METHOD_PRIORITY {
            if !order.contains(&method) && self.is_available(method) {
                order.push(method);
            }
        }
        order
    }

    /// Dispatches one attempt with one method.
    async fn fetch_with_method(&self, method: ScrapingMethod, url: &str) -> FetchResult {
        match method {
            ScrapingMethod::HttpFetch => self.http.fetch(url).await,
            ScrapingMethod::ProxyService => self.proxy.fetch(url).await,
            ScrapingMethod::BrowserService => self.browser.fetch(url).await,
            ScrapingMethod::FrontendBrowser => FetchResult::failure(
                url,
                method,
                "frontend_browser cannot be dispatched server-side",
                0,
            ),
        }
    }

    /// Fetches `url`, escalating through the method order until a result
    /// succeeds or the ladder is exhausted.
    ///
    /// On exhaustion the returned result is a synthetic failure tagged
    /// `http_fetch` with the full attempted-methods list preserved.
    pub async fn fetch_with_fallback(&self, url: &str, options: &FetchOptions) -> StrategyResult {
        let start = Instant::now();
        let order = self.method_order(options.preferred_method);
        let mut methods_attempted: Vec<ScrapingMethod> = Vec::new();

        for method in order {
            methods_attempted.push(method);
            let mut last: Option<FetchResult> = None;

            for attempt in 1..=options.max_retries.max(1) {
                debug!("{method}: attempt {attempt} for {url}");
                let result = self.fetch_with_method(method, url).await;
                self.error_stats.record_fetch(&result);

                if result.success {
                    let fallback_used = methods_attempted.len() > 1;
                    if fallback_used {
                        info!("{url}: succeeded via {method} after fallback");
                    }
                    return StrategyResult {
                        result,
                        methods_attempted,
                        fallback_used,
                    };
                }
                last = Some(result);
            }

            // All retries for this method failed
            let result = last.expect("at least one attempt was made");
            if !options.enable_fallback {
                return StrategyResult {
                    result,
                    fallback_used: methods_attempted.len() > 1,
                    methods_attempted,
                };
            }
            if !should_escalate(&result) {
                debug!(
                    "{url}: not escalating past {method} (status {:?})",
                    result.status_code
                );
                return StrategyResult {
                    result,
                    fallback_used: methods_attempted.len() > 1,
                    methods_attempted,
                };
            }
            debug!(
                "{url}: escalating past {method} ({})",
                result.error.as_deref().unwrap_or("blocked")
            );
        }

        // Ladder exhausted without a success
        self.error_stats.increment(ErrorType::AllMethodsFailed);
        let result = FetchResult::failure(
            url,
            ScrapingMethod::HttpFetch,
            "All scraping methods failed",
            start.elapsed().as_millis() as u64,
        );
        StrategyResult {
            result,
            fallback_used: methods_attempted.len() > 1,
            methods_attempted,
        }
    }
}

/// Decides whether a failed result justifies trying the next, heavier
/// adapter.
///
/// Escalates on every recoverable block signal: Cloudflare, CAPTCHA, the
/// blocked flag, JS-required, 401/403, insufficient extracted text, and
/// 5xx responses. Does not escalate on 404: the page does not exist, and
/// no adapter will change that. Any other failure escalates as well, so an
/// unclassified error still climbs the ladder before giving up.
pub fn should_escalate(result: &FetchResult) -> bool {
    if result.status_code == Some(404) {
        return false;
    }
    if result.success {
        return false;
    }

    let meta = &result.metadata;
    if meta.cloudflare_detected
        || meta.captcha_detected
        || meta.blocked
        || meta.requires_javascript
    {
        return true;
    }
    if matches!(result.status_code, Some(401) | Some(403)) {
        return true;
    }
    if meta.extracted_text_length <= MIN_EXTRACTED_TEXT_LENGTH {
        return true;
    }
    if result.status_code.is_some_and(|s| s >= 500) {
        return true;
    }
    // Unclassified failure: try harder before giving up
    true
}
