// Shared test helpers for database setup and scraper stubs.
//
// This module provides common utilities used across multiple test files to
// reduce duplication.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::SqlitePool;

use page_harvest::quality::DataQuality;
use page_harvest::run_migrations;
use page_harvest::scrape::{ScrapeOutcome, UrlScraper};
use page_harvest::storage::jobs::cancel_job;
use page_harvest::storage::models::UrlEntry;

/// Creates a test database pool with migrations applied.
/// Uses an in-memory database for fast test execution.
#[allow(dead_code)] // Used by other test files
pub async fn create_test_pool() -> Arc<SqlitePool> {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    Arc::new(pool)
}

/// Builds a successful scrape outcome.
#[allow(dead_code)]
pub fn ok_outcome(record_id: i64) -> anyhow::Result<ScrapeOutcome> {
    Ok(ScrapeOutcome {
        success: true,
        record_id: Some(record_id),
        data_quality: Some(DataQuality::Medium),
        data_completeness: Some(0.5),
        error: None,
    })
}

/// Builds a handled-failure scrape outcome.
#[allow(dead_code)]
pub fn failed_outcome() -> anyhow::Result<ScrapeOutcome> {
    Ok(ScrapeOutcome {
        success: false,
        record_id: None,
        data_quality: None,
        data_completeness: None,
        error: Some("All scraping methods failed".to_string()),
    })
}

/// A scraper double that replays a fixed script of outcomes, one per call.
#[allow(dead_code)]
pub struct ScriptedScraper {
    outcomes: Mutex<VecDeque<anyhow::Result<ScrapeOutcome>>>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedScraper {
    pub fn new(outcomes: Vec<anyhow::Result<ScrapeOutcome>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UrlScraper for ScriptedScraper {
    async fn scrape(&self, _entry: &UrlEntry) -> anyhow::Result<ScrapeOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedScraper ran out of outcomes")
    }
}

/// A scraper double that cancels its own job during the Nth scrape call,
/// simulating a cancellation request landing while a URL is in flight.
#[allow(dead_code)]
pub struct CancellingScraper {
    pool: Arc<SqlitePool>,
    pub job_id: AtomicI64,
    cancel_on_call: usize,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl CancellingScraper {
    pub fn new(pool: Arc<SqlitePool>, cancel_on_call: usize) -> Self {
        Self {
            pool,
            job_id: AtomicI64::new(0),
            cancel_on_call,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_job_id(&self, id: i64) {
        self.job_id.store(id, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UrlScraper for CancellingScraper {
    async fn scrape(&self, _entry: &UrlEntry) -> anyhow::Result<ScrapeOutcome> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.cancel_on_call {
            let job_id = self.job_id.load(Ordering::SeqCst);
            cancel_job(&self.pool, job_id)
                .await
                .expect("cancel_job must succeed for a running job");
        }
        ok_outcome(call as i64)
    }
}

/// Builds N distinct URL entries.
#[allow(dead_code)]
pub fn url_entries(n: usize) -> Vec<UrlEntry> {
    (0..n)
        .map(|i| UrlEntry::new(format!("https://example-{i}.gov/bids")))
        .collect()
}
