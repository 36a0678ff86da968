//! Content classification heuristics.
//!
//! Pure, side-effect-free functions that inspect raw HTML, the HTTP status
//! code, and the extracted text to detect bot-blocking conditions
//! (Cloudflare challenge, CAPTCHA, auth wall, JS-required rendering) and to
//! classify page intent (procurement listing vs. detail vs. unknown).
//!
//! All detectors match case-insensitively against a lowercased haystack.
//! The page-type priority order in [`detect_page_type`] is load-bearing:
//! a Cloudflare interstitial that happens to mention "opportunity" must
//! classify as a challenge, not as a procurement listing.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;

use crate::config::{
    JS_DETECTION_HTML_THRESHOLD, JS_DETECTION_TEXT_THRESHOLD, MIN_EXTRACTED_TEXT_LENGTH,
};

// CSS selector strings
const TITLE_SELECTOR_STR: &str = "title";

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(TITLE_SELECTOR_STR).expect("Failed to parse title selector - this is a bug")
});

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("Failed to compile script regex")
});
static STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("Failed to compile style regex")
});
static NOSCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<noscript[^>]*>.*?</noscript>").expect("Failed to compile noscript regex")
});
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Failed to compile comment regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("Failed to compile tag regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));

/// Substrings that identify a Cloudflare browser challenge.
const CLOUDFLARE_MARKERS: &[&str] = &[
    "just a moment...",
    "checking your browser",
    "ddos protection by cloudflare",
    "cf-browser-verification",
    "challenge-platform",
    "__cf_chl",
];

/// Substrings that identify a CAPTCHA wall.
const CAPTCHA_MARKERS: &[&str] = &[
    "recaptcha",
    "hcaptcha",
    "captcha",
    "i'm not a robot",
    "verify you are human",
];

/// Phrases that identify a login or auth wall in the body.
const AUTH_MARKERS: &[&str] = &[
    "login",
    "sign in",
    "log in",
    "authentication required",
    "please sign in",
    "access denied",
    "unauthorized",
];

/// SPA-framework fingerprints: a page built around one of these mount
/// points renders its content client-side.
const SPA_MARKERS: &[&str] = &[
    r#"<div id="root">"#,
    r#"<div id="app">"#,
    r#"<div id="__next">"#,
    "data-reactroot",
    "__next_data__",
    "window.__initial_state__",
];

/// Loading-placeholder phrases shown while a client-side app boots.
const LOADING_MARKERS: &[&str] = &[
    "please enable javascript",
    "javascript is required",
    "you need to enable javascript",
    "loading...",
];

/// Phrases found on generic error pages.
const ERROR_PAGE_MARKERS: &[&str] = &[
    "404 not found",
    "page not found",
    "internal server error",
    "service unavailable",
    "an error occurred",
];

/// Keywords whose presence marks a page as procurement-related.
const PROCUREMENT_KEYWORDS: &[&str] = &[
    "rfp",
    "rfq",
    "bid",
    "proposal",
    "procurement",
    "solicitation",
    "contract",
    "tender",
    "opportunity",
    "vendor",
];

/// Secondary keywords that disambiguate a listing page from a detail page.
const LISTING_KEYWORDS: &[&str] = &[
    "results",
    "search",
    "opportunities",
    "current bids",
    "open bids",
];

/// Page intent as determined by [`detect_page_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageType {
    ProcurementList,
    ProcurementDetail,
    LoginPage,
    ErrorPage,
    EmptyPage,
    CloudflareChallenge,
    CaptchaPage,
    Unknown,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::ProcurementList => "procurement-list",
            PageType::ProcurementDetail => "procurement-detail",
            PageType::LoginPage => "login-page",
            PageType::ErrorPage => "error-page",
            PageType::EmptyPage => "empty-page",
            PageType::CloudflareChallenge => "cloudflare-challenge",
            PageType::CaptchaPage => "captcha-page",
            PageType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| haystack.contains(m))
}

/// Returns true if the body (or title) carries a Cloudflare challenge
/// fingerprint.
pub fn detect_cloudflare_challenge(html: &str, title: Option<&str>) -> bool {
    let mut haystack = html.to_lowercase();
    if let Some(title) = title {
        haystack.push_str(&title.to_lowercase());
    }
    contains_any(&haystack, CLOUDFLARE_MARKERS)
}

/// Returns true if the body carries a CAPTCHA fingerprint.
pub fn detect_captcha(html: &str) -> bool {
    contains_any(&html.to_lowercase(), CAPTCHA_MARKERS)
}

/// Returns true if the response demands authentication.
///
/// A 401 or 403 status is authoritative; otherwise the body is scanned for
/// login/auth-wall phrases. The phrase check is deliberately broad (most
/// auth walls say little more than "sign in"), so callers should treat a
/// positive on a 2xx page as advisory rather than blocking.
pub fn detect_auth_required(html: &str, status_code: Option<u16>) -> bool {
    if matches!(status_code, Some(401) | Some(403)) {
        return true;
    }
    contains_any(&html.to_lowercase(), AUTH_MARKERS)
}

/// Returns true if the page appears to require client-side rendering.
///
/// Two signals, either of which is sufficient: substantial markup with
/// almost no visible text, or an SPA mount point / loading placeholder in
/// the body.
pub fn detect_javascript_required(html: &str, extracted_text_length: usize) -> bool {
    if html.len() > JS_DETECTION_HTML_THRESHOLD
        && extracted_text_length < JS_DETECTION_TEXT_THRESHOLD
    {
        return true;
    }
    let haystack = html.to_lowercase();
    contains_any(&haystack, SPA_MARKERS) || contains_any(&haystack, LOADING_MARKERS)
}

/// Classifies page intent.
///
/// Evaluated in strict priority order: Cloudflare challenge, CAPTCHA, error
/// page (status >= 400 or error phrases), auth wall, empty page, then
/// procurement keyword presence disambiguated into list vs. detail. The
/// ordering matters: block conditions must win over topic keywords.
pub fn detect_page_type(
    html: &str,
    status_code: Option<u16>,
    extracted_text_length: usize,
    title: Option<&str>,
) -> PageType {
    if detect_cloudflare_challenge(html, title) {
        return PageType::CloudflareChallenge;
    }
    if detect_captcha(html) {
        return PageType::CaptchaPage;
    }
    let haystack = html.to_lowercase();
    if status_code.is_some_and(|s| s >= 400) || contains_any(&haystack, ERROR_PAGE_MARKERS) {
        return PageType::ErrorPage;
    }
    if contains_any(&haystack, AUTH_MARKERS) {
        return PageType::LoginPage;
    }
    if extracted_text_length < MIN_EXTRACTED_TEXT_LENGTH {
        return PageType::EmptyPage;
    }
    if contains_any(&haystack, PROCUREMENT_KEYWORDS) {
        if contains_any(&haystack, LISTING_KEYWORDS) {
            return PageType::ProcurementList;
        }
        return PageType::ProcurementDetail;
    }
    PageType::Unknown
}

/// Extracts the page title from raw HTML.
///
/// Returns `None` when no non-empty `<title>` element is present.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|element| element.inner_html().trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Extracts visible plain text from raw HTML.
///
/// Strips `<script>`, `<style>`, `<noscript>`, comments, and all remaining
/// tags, unescapes the five common HTML entities, collapses whitespace runs
/// to single spaces, trims, and truncates to `max_length` characters.
pub fn extract_text_from_html(html: &str, max_length: usize) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let without_styles = STYLE_RE.replace_all(&without_scripts, " ");
    let without_noscript = NOSCRIPT_RE.replace_all(&without_styles, " ");
    let without_comments = COMMENT_RE.replace_all(&without_noscript, " ");
    let without_tags = TAG_RE.replace_all(&without_comments, " ");

    let unescaped = without_tags
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    let collapsed = WHITESPACE_RE.replace_all(&unescaped, " ");
    truncate_chars(collapsed.trim(), max_length)
}

/// Truncates a string to at most `max_chars` characters, respecting char
/// boundaries.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
