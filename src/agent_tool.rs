//! Fetch tool surface exposed to the upstream AI-agent collaborator.
//!
//! One callable that runs the fallback orchestrator and flattens the fetch
//! result, classifier metadata, and orchestration metadata into a single
//! JSON-serializable object. This is the seam between the acquisition
//! engine and whatever agent/LLM layer interprets the fetched content; no
//! assumptions are made about the consumer.

use std::time::Instant;

use serde_json::{json, Value};

use crate::models::ScrapingMethod;
use crate::strategy::{FetchEngine, FetchOptions};

/// Fetches a webpage and returns the full result as one flat JSON object.
///
/// `preferred_method` picks the first rung of the ladder; `enable_fallback`
/// (default true) controls escalation past it.
pub async fn fetch_webpage_content(
    engine: &FetchEngine,
    url: &str,
    preferred_method: Option<ScrapingMethod>,
    enable_fallback: Option<bool>,
) -> Value {
    let start = Instant::now();
    let options = FetchOptions {
        preferred_method,
        enable_fallback: enable_fallback.unwrap_or(true),
        ..FetchOptions::default()
    };

    let strategy = engine.fetch_with_fallback(url, &options).await;
    let result = &strategy.result;
    let meta = &result.metadata;

    json!({
        "url": result.url,
        "final_url": result.final_url,
        "status_code": result.status_code,
        "content_type": result.content_type,
        "success": result.success,
        "error": result.error,
        "method": result.method.as_str(),
        "methods_attempted": strategy
            .methods_attempted
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>(),
        "fallback_used": strategy.fallback_used,
        "duration_ms": result.duration_ms,
        "total_duration_ms": start.elapsed().as_millis() as u64,
        "title": result.title,
        "extracted_text": result.extracted_text,
        "raw_html_length": meta.raw_html_length,
        "extracted_text_length": meta.extracted_text_length,
        "blocked": meta.blocked,
        "requires_javascript": meta.requires_javascript,
        "requires_auth": meta.requires_auth,
        "cloudflare_detected": meta.cloudflare_detected,
        "captcha_detected": meta.captcha_detected,
        "page_type": meta.page_type.as_str(),
        "warnings": meta.warnings,
    })
}
