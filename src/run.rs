//! Library entry points: batch execution and single-URL fetch.
//!
//! `run_batch` is the main flow behind the CLI: it reads the URL list,
//! creates a batch job, executes it through the coordinator, and reports
//! summary statistics. The coordinator runs as a spawned task with the job
//! row as the only shared state, exactly as a server-side deployment would
//! run it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::info;
use strum::IntoEnumIterator;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::app::{log_progress, validate_and_normalize_url};
use crate::config::{ServiceKeys, LOGGING_INTERVAL_SECS};
use crate::coordinator::{BatchCoordinator, CoordinatorConfig};
use crate::error_handling::{ErrorStats, ErrorType};
use crate::initialization::{init_client, init_engine};
use crate::models::ScrapingMethod;
use crate::scrape::ScrapeService;
use crate::storage::jobs::{create_job, get_job};
use crate::storage::models::{JobType, UrlEntry};
use crate::storage::pool::init_db_pool_with_path;
use crate::storage::run_migrations;
use crate::strategy::FetchOptions;

/// Options for a batch run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// URL list file; "-" reads from stdin.
    pub file: PathBuf,
    /// SQLite database path.
    pub db_path: PathBuf,
    /// User-Agent for all outbound requests.
    pub user_agent: String,
    /// Identity that owns the created job.
    pub owner: String,
    /// Method to try first for every URL.
    pub preferred_method: Option<ScrapingMethod>,
    /// Whether to escalate past a failed method.
    pub enable_fallback: bool,
}

/// Results of a completed batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Identifier of the executed job.
    pub job_id: i64,
    /// Total number of URLs in the job.
    pub total_urls: i64,
    /// URLs scraped successfully.
    pub completed: i64,
    /// URLs that failed.
    pub failed: i64,
    /// Final job status (completed/failed/cancelled).
    pub status: String,
    /// Path to the SQLite database containing results.
    pub db_path: PathBuf,
    /// Elapsed time in seconds.
    pub elapsed_seconds: f64,
}

/// Reads URL entries from a file or stdin.
///
/// One URL per line; blank lines and `#` comments are skipped. A line may
/// carry tab-separated context: `URL<TAB>STATE<TAB>CAPITAL`. Invalid URLs
/// are logged and dropped.
pub async fn read_url_entries(file: &PathBuf) -> Result<Vec<UrlEntry>> {
    // Collect lines first; URL lists are small enough that streaming
    // buys nothing here.
    let raw = if file.as_os_str() == "-" {
        info!("Reading URLs from stdin");
        let mut collected = Vec::new();
        let mut reader = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = reader.next_line().await? {
            collected.push(line);
        }
        collected
    } else {
        let handle = tokio::fs::File::open(file)
            .await
            .with_context(|| format!("Failed to open input file {}", file.display()))?;
        let mut collected = Vec::new();
        let mut reader = BufReader::new(handle).lines();
        while let Some(line) = reader.next_line().await? {
            collected.push(line);
        }
        collected
    };

    let mut entries = Vec::new();
    for line in raw {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split('\t');
        let raw_url = parts.next().unwrap_or_default().trim();
        let Some(url) = validate_and_normalize_url(raw_url) else {
            continue;
        };
        let state = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let capital = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        entries.push(UrlEntry {
            url,
            state,
            capital,
            link_id: None,
        });
    }

    Ok(entries)
}

/// Runs a batch scrape with the provided options.
///
/// This is the main entry point for the library. It reads URLs from the
/// input file, creates a batch job, processes the URLs sequentially with
/// fallback escalation, and stores per-URL records in the SQLite database.
///
/// # Errors
///
/// Returns an error if the input file cannot be read, no valid URLs remain
/// after validation, or database initialization fails. Per-URL failures do
/// not error: they are counted in the report.
pub async fn run_batch(options: RunOptions) -> Result<BatchReport> {
    let entries = read_url_entries(&options.file).await?;
    if entries.is_empty() {
        return Err(anyhow!("No valid URLs found in input"));
    }
    info!("Total URLs to process: {}", entries.len());

    let pool = init_db_pool_with_path(&options.db_path)
        .await
        .context("Failed to initialize database pool")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let client = init_client(&options.user_agent).context("Failed to initialize HTTP client")?;
    let keys = ServiceKeys::from_env();
    if keys.proxy_api_key.is_none() {
        info!("Proxy rendering service disabled (no API key configured)");
    }
    if keys.browser_api_key.is_none() {
        info!("Browser service disabled (no API key configured)");
    }
    let error_stats = Arc::new(ErrorStats::new());
    let engine = init_engine(client, &keys, Arc::clone(&error_stats));

    let fetch_options = FetchOptions {
        preferred_method: options.preferred_method,
        enable_fallback: options.enable_fallback,
        ..FetchOptions::default()
    };
    let scraper = Arc::new(ScrapeService::new(
        Arc::clone(&pool),
        engine,
        fetch_options,
    ));
    let coordinator = Arc::new(BatchCoordinator::new(
        Arc::clone(&pool),
        scraper,
        CoordinatorConfig::default(),
    ));

    let job_type = if entries.len() == 1 {
        JobType::Single
    } else {
        JobType::Multiple
    };
    let job_id = create_job(&pool, &options.owner, job_type, &entries).await?;
    info!("Created batch job {job_id}");

    let start_time = std::time::Instant::now();
    let job_task = Arc::clone(&coordinator).spawn(job_id);

    // Periodic progress logging, shut down once the job task finishes
    let cancel = CancellationToken::new();
    let progress_token = cancel.child_token();
    let progress_pool = Arc::clone(&pool);
    let logging_task = tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(LOGGING_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Ok(Some(job)) = get_job(&progress_pool, job_id).await {
                        log_progress(start_time, job.completed_urls, job.failed_urls, job.total_urls);
                    }
                }
                _ = progress_token.cancelled() => {
                    break;
                }
            }
        }
    });

    if let Err(join_error) = job_task.await {
        log::warn!("Job task panicked: {join_error:?}");
    }
    cancel.cancel();
    let _ = logging_task.await;

    let job = get_job(&pool, job_id)
        .await?
        .ok_or_else(|| anyhow!("Job {job_id} disappeared from the database"))?;

    log_error_statistics(&error_stats);

    Ok(BatchReport {
        job_id,
        total_urls: job.total_urls,
        completed: job.completed_urls,
        failed: job.failed_urls,
        status: job.status,
        db_path: options.db_path,
        elapsed_seconds: start_time.elapsed().as_secs_f64(),
    })
}

/// Fetches a single URL through the fallback orchestrator and returns the
/// agent-tool JSON surface. No database is touched.
pub async fn run_single_fetch(
    user_agent: &str,
    url: &str,
    preferred_method: Option<ScrapingMethod>,
    enable_fallback: bool,
) -> Result<serde_json::Value> {
    let Some(url) = validate_and_normalize_url(url) else {
        return Err(anyhow!("Invalid URL"));
    };
    let client = init_client(user_agent).context("Failed to initialize HTTP client")?;
    let keys = ServiceKeys::from_env();
    let engine = init_engine(client, &keys, Arc::new(ErrorStats::new()));
    Ok(crate::agent_tool::fetch_webpage_content(
        &engine,
        &url,
        preferred_method,
        Some(enable_fallback),
    )
    .await)
}

/// Logs non-zero error counters accumulated over a run.
fn log_error_statistics(stats: &ErrorStats) {
    let mut any = false;
    for error_type in ErrorType::iter() {
        let count = stats.get_count(error_type);
        if count > 0 {
            if !any {
                info!("Fetch failure breakdown:");
                any = true;
            }
            info!("  {}: {}", error_type.as_str(), count);
        }
    }
}
