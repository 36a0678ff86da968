//! Single-URL scrape operation.
//!
//! This is the boundary where every failure mode is converted into data: a
//! scrape record is created `in_progress` before the fetch pipeline runs
//! and always ends in `completed` or `failed`, whether the pipeline
//! succeeded, failed in a handled way, or errored unexpectedly. Callers can
//! rely on get-a-result-back semantics.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::quality::{self, DataQuality};
use crate::storage::models::{TokenUsage, UrlEntry};
use crate::storage::records;
use crate::strategy::{FetchEngine, FetchOptions};

/// Outcome of one single-URL scrape operation.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeOutcome {
    pub success: bool,
    pub record_id: Option<i64>,
    pub data_quality: Option<DataQuality>,
    pub data_completeness: Option<f64>,
    pub error: Option<String>,
}

/// The seam between the batch coordinator and the scrape pipeline.
///
/// The coordinator treats an `Err` from this trait as a per-URL failure
/// and moves on; it never aborts the batch. Test doubles implement this to
/// drive the coordinator without network or records.
#[async_trait]
pub trait UrlScraper: Send + Sync {
    async fn scrape(&self, entry: &UrlEntry) -> anyhow::Result<ScrapeOutcome>;
}

/// Production scraper: fallback orchestrator + content analysis + record
/// persistence.
pub struct ScrapeService {
    pool: Arc<SqlitePool>,
    engine: FetchEngine,
    options: FetchOptions,
}

impl ScrapeService {
    pub fn new(pool: Arc<SqlitePool>, engine: FetchEngine, options: FetchOptions) -> Self {
        Self {
            pool,
            engine,
            options,
        }
    }
}

#[async_trait]
impl UrlScraper for ScrapeService {
    /// Scrapes one URL and persists the outcome.
    ///
    /// Returns `Err` only when the record row itself could not be created;
    /// after that point every exit path updates the record and returns
    /// `Ok`, so the record is never left `in_progress`.
    async fn scrape(&self, entry: &UrlEntry) -> anyhow::Result<ScrapeOutcome> {
        let record_id = records::create_record(&self.pool, entry).await?;
        debug!("scrape: record {record_id} in_progress for {}", entry.url);

        let strategy = self.engine.fetch_with_fallback(&entry.url, &self.options).await;

        if !strategy.result.success {
            let error = strategy
                .result
                .error
                .clone()
                .unwrap_or_else(|| "Scrape failed".to_string());
            if let Err(db_err) = records::fail_record(&self.pool, record_id, &error).await {
                warn!("Failed to mark record {record_id} failed: {db_err}");
            }
            return Ok(ScrapeOutcome {
                success: false,
                record_id: Some(record_id),
                data_quality: None,
                data_completeness: None,
                error: Some(error),
            });
        }

        let analysis = quality::analyze(&strategy.result);

        // The heuristic analyzer spends no tokens; an external agent layer
        // may overwrite these later.
        let tokens = TokenUsage::default();

        match records::complete_record(&self.pool, record_id, &strategy, &analysis, tokens).await
        {
            Ok(()) => Ok(ScrapeOutcome {
                success: true,
                record_id: Some(record_id),
                data_quality: Some(analysis.data_quality),
                data_completeness: Some(analysis.completeness),
                error: None,
            }),
            Err(db_err) => {
                // The completion write failed unexpectedly; land the record
                // in `failed` rather than leaving it dangling.
                let error = format!("Failed to store scrape result: {db_err}");
                if let Err(inner) = records::fail_record(&self.pool, record_id, &error).await {
                    warn!("Failed to mark record {record_id} failed: {inner}");
                }
                Ok(ScrapeOutcome {
                    success: false,
                    record_id: Some(record_id),
                    data_quality: None,
                    data_completeness: None,
                    error: Some(error),
                })
            }
        }
    }
}
