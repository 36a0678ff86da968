//! Scrape-record lifecycle tests: a record is created `in_progress` and
//! always ends in exactly one of `completed` or `failed`.

mod helpers;

use std::sync::Arc;

use page_harvest::error_handling::ErrorStats;
use page_harvest::fetch::{BrowserConfig, BrowserFetcher, HttpFetcher, ProxyConfig, ProxyFetcher};
use page_harvest::scrape::{ScrapeService, UrlScraper};
use page_harvest::storage::models::{RecordStatus, UrlEntry};
use page_harvest::storage::records::get_record;
use page_harvest::strategy::{FetchEngine, FetchOptions};
use page_harvest::ScrapingMethod;

use helpers::create_test_pool;

/// Engine with no service keys configured; direct HTTP only.
fn offline_engine() -> FetchEngine {
    let client = Arc::new(reqwest::Client::new());
    FetchEngine::new(
        HttpFetcher::new(Arc::clone(&client)),
        ProxyFetcher::new(Arc::clone(&client), ProxyConfig::default()),
        BrowserFetcher::new(client, BrowserConfig::default()),
        Arc::new(ErrorStats::new()),
    )
}

#[tokio::test]
async fn test_handled_failure_lands_record_in_failed() {
    let pool = create_test_pool().await;
    let service = ScrapeService::new(Arc::clone(&pool), offline_engine(), FetchOptions::default());

    let entry = UrlEntry {
        url: "not a url".to_string(),
        state: Some("TX".to_string()),
        capital: Some("Austin".to_string()),
        link_id: Some("link-1".to_string()),
    };
    let outcome = service.scrape(&entry).await.expect("scrape returns Ok");

    assert!(!outcome.success);
    assert!(outcome.error.is_some());

    let record_id = outcome.record_id.expect("a record must have been created");
    let row = get_record(&pool, record_id).await.unwrap().unwrap();
    assert_eq!(row.status(), Some(RecordStatus::Failed));
    assert_ne!(row.status(), Some(RecordStatus::InProgress));
    assert_eq!(row.error.as_deref(), Some("All scraping methods failed"));
    // Per-URL context is carried onto the record
    assert_eq!(row.state.as_deref(), Some("TX"));
    assert_eq!(row.link_id.as_deref(), Some("link-1"));
}

#[tokio::test]
async fn test_preferred_unconfigured_method_still_resolves() {
    // Preferring an unconfigured service must not wedge the pipeline: the
    // method order collapses to direct HTTP and the record still resolves.
    let pool = create_test_pool().await;
    let options = FetchOptions {
        preferred_method: Some(ScrapingMethod::BrowserService),
        ..FetchOptions::default()
    };
    let service = ScrapeService::new(Arc::clone(&pool), offline_engine(), options);

    let outcome = service
        .scrape(&UrlEntry::new("not a url"))
        .await
        .expect("scrape returns Ok");

    let record_id = outcome.record_id.unwrap();
    let row = get_record(&pool, record_id).await.unwrap().unwrap();
    assert_ne!(row.status(), Some(RecordStatus::InProgress));
    // Only http_fetch was attempted
    assert!(!outcome.success);
}
