//! Fetch adapters: three interchangeable strategies to retrieve a URL's
//! rendered content.
//!
//! Common contract: `fetch(url) -> FetchResult`. Adapters never return
//! `Err`; every failure mode (network error, timeout, non-2xx, missing API
//! key) is captured into a failed [`FetchResult`] with a populated error
//! string. Every adapter measures wall-clock duration and includes it in
//! the result.
//!
//! All three adapters share the text-extraction and page-type-detection
//! logic from the classifier via [`build_result`].

pub mod browser;
pub mod http;
pub mod proxy;

pub use browser::{BrowserConfig, BrowserFetcher, WaitUntil};
pub use http::HttpFetcher;
pub use proxy::{ProxyConfig, ProxyFetcher};

use crate::classifier::{
    detect_auth_required, detect_captcha, detect_cloudflare_challenge,
    detect_javascript_required, detect_page_type, extract_text_from_html, extract_title,
    truncate_chars,
};
use crate::config::{MAX_EXTRACTED_TEXT_LENGTH, MAX_RAW_HTML_LENGTH, MIN_EXTRACTED_TEXT_LENGTH};
use crate::models::{FetchMetadata, FetchResult, ScrapingMethod};

/// Raw response material an adapter hands to [`build_result`].
pub(crate) struct ResponseParts<'a> {
    pub url: &'a str,
    pub final_url: String,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub body: &'a str,
    pub method: ScrapingMethod,
    pub duration_ms: u64,
    /// True when the body came back from a rendering service. Rendered
    /// bodies have already been through a real browser, so the JS-required
    /// flag is forced false and the Cloudflare/CAPTCHA detectors no longer
    /// gate success.
    pub rendered: bool,
}

/// Classifies a response body and assembles the normalized [`FetchResult`].
///
/// For a direct HTTP fetch, success requires a 2xx status, no Cloudflare or
/// CAPTCHA fingerprint, and extracted text above the minimum length. For a
/// rendered body only the text-length gate applies.
pub(crate) fn build_result(parts: ResponseParts<'_>) -> FetchResult {
    let extracted_text = extract_text_from_html(parts.body, MAX_EXTRACTED_TEXT_LENGTH);
    let text_len = extracted_text.len();
    let title = extract_title(parts.body);

    let cloudflare_detected = detect_cloudflare_challenge(parts.body, title.as_deref());
    let captcha_detected = detect_captcha(parts.body);
    let requires_auth = detect_auth_required(parts.body, parts.status_code);
    let requires_javascript = if parts.rendered {
        false
    } else {
        detect_javascript_required(parts.body, text_len)
    };
    let page_type = detect_page_type(parts.body, parts.status_code, text_len, title.as_deref());
    let blocked = cloudflare_detected
        || captcha_detected
        || matches!(parts.status_code, Some(401) | Some(403));

    let mut warnings = Vec::new();
    if cloudflare_detected {
        warnings.push("Cloudflare challenge detected".to_string());
    }
    if requires_javascript {
        warnings.push("Page likely requires JavaScript rendering".to_string());
    }
    if captcha_detected {
        warnings.push("CAPTCHA detected".to_string());
    }

    let status_ok = parts
        .status_code
        .is_some_and(|s| (200..300).contains(&s));
    let text_sufficient = text_len > MIN_EXTRACTED_TEXT_LENGTH;
    let success = if parts.rendered {
        text_sufficient
    } else {
        status_ok && !cloudflare_detected && !captcha_detected && text_sufficient
    };

    let error = if success {
        None
    } else if cloudflare_detected {
        Some("Cloudflare challenge detected".to_string())
    } else if captcha_detected {
        Some("CAPTCHA detected".to_string())
    } else if !parts.rendered && !status_ok {
        Some(format!(
            "HTTP status {}",
            parts.status_code.map_or_else(|| "unknown".to_string(), |s| s.to_string())
        ))
    } else {
        Some("Extracted text below minimum length".to_string())
    };

    FetchResult {
        url: parts.url.to_string(),
        final_url: parts.final_url,
        status_code: parts.status_code,
        content_type: parts.content_type,
        html: truncate_chars(parts.body, MAX_RAW_HTML_LENGTH),
        extracted_text,
        title,
        method: parts.method,
        duration_ms: parts.duration_ms,
        success,
        error,
        metadata: FetchMetadata {
            blocked,
            requires_javascript,
            requires_auth,
            cloudflare_detected,
            captcha_detected,
            raw_html_length: parts.body.len(),
            extracted_text_length: text_len,
            page_type,
            warnings,
        },
    }
}
