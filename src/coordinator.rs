//! Batch job coordinator.
//!
//! Drives the single-URL scrape operation over a job's URL list as a
//! long-running, cancellable, progress-tracked task. The job row is the
//! only handoff channel: the coordinator re-reads the persisted status at
//! every natural suspension point (before each fetch, after each fetch,
//! after the politeness delay), so cancellation is observed within one
//! unit of work and a restarted process can resume from persisted state.
//!
//! URLs within one job run strictly sequentially. Counter updates are
//! persisted immediately after each URL so observers see live progress.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;

use crate::config::POLITENESS_DELAY;
use crate::error_handling::JobError;
use crate::scrape::UrlScraper;
use crate::storage::jobs::{
    fetch_status, finalize_job, get_job, mark_in_progress, record_url_outcome,
};
use crate::storage::models::JobStatus;

/// Tunables for one coordinator instance.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Pause between successive URLs. Production default is
    /// [`POLITENESS_DELAY`]; tests inject zero.
    pub politeness_delay: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            politeness_delay: POLITENESS_DELAY,
        }
    }
}

/// Executes batch jobs against a [`UrlScraper`].
pub struct BatchCoordinator {
    pool: Arc<SqlitePool>,
    scraper: Arc<dyn UrlScraper>,
    config: CoordinatorConfig,
}

impl BatchCoordinator {
    pub fn new(
        pool: Arc<SqlitePool>,
        scraper: Arc<dyn UrlScraper>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            pool,
            scraper,
            config,
        }
    }

    /// Runs a job to a terminal state, logging instead of propagating
    /// errors. A coordinator-level error finalizes the job as `failed`,
    /// which is what distinguishes "the job crashed" from "the job ran and
    /// every URL failed" (the latter still completes).
    pub async fn execute(&self, job_id: i64) {
        if let Err(e) = self.run_job(job_id).await {
            error!("Batch job {job_id} crashed: {e}");
            match finalize_job(&self.pool, job_id, JobStatus::Failed, Some(&e.to_string())).await
            {
                Ok(_) => {}
                Err(f) => error!("Failed to finalize crashed job {job_id}: {f}"),
            }
        }
    }

    /// Spawns `execute` as a detached background task.
    pub fn spawn(self: Arc<Self>, job_id: i64) -> JoinHandle<()> {
        tokio::spawn(async move { self.execute(job_id).await })
    }

    /// The job loop proper. Returns `Err` only on coordinator-level
    /// failures (job missing, database unreachable); per-URL scrape errors
    /// are contained as failed-URL counter bumps.
    pub async fn run_job(&self, job_id: i64) -> Result<(), JobError> {
        let Some(job) = get_job(&self.pool, job_id).await? else {
            return Err(JobError::NotFound(job_id));
        };

        match job.status() {
            Some(JobStatus::Cancelled) => {
                // Cancellation requested before execution started
                info!("Job {job_id} cancelled before start; skipping");
                return Ok(());
            }
            Some(status) if status.is_terminal() => {
                warn!("Job {job_id} already {status}; nothing to do");
                return Ok(());
            }
            _ => {}
        }

        if !mark_in_progress(&self.pool, job_id).await? {
            // Turned terminal between the read above and the transition
            return Ok(());
        }

        let entries = job.url_entries();
        let total = entries.len();
        info!("Job {job_id}: processing {total} URL(s)");

        for (index, entry) in entries.iter().enumerate() {
            if self.is_cancelled(job_id).await? {
                info!("Job {job_id} cancelled at URL {}/{total}", index + 1);
                return Ok(());
            }

            let outcome = self.scraper.scrape(entry).await;
            match outcome {
                Ok(outcome) if outcome.success => {
                    record_url_outcome(&self.pool, job_id, true, outcome.record_id).await?;
                }
                Ok(outcome) => {
                    info!(
                        "Job {job_id}: URL {} failed: {}",
                        entry.url,
                        outcome.error.as_deref().unwrap_or("unknown")
                    );
                    record_url_outcome(&self.pool, job_id, false, None).await?;
                }
                Err(e) => {
                    // One bad URL never aborts the batch
                    warn!("Job {job_id}: scraper error for {}: {e:#}", entry.url);
                    record_url_outcome(&self.pool, job_id, false, None).await?;
                }
            }

            if self.is_cancelled(job_id).await? {
                info!("Job {job_id} cancelled after URL {}/{total}", index + 1);
                return Ok(());
            }

            if index + 1 < total && !self.config.politeness_delay.is_zero() {
                tokio::time::sleep(self.config.politeness_delay).await;

                if self.is_cancelled(job_id).await? {
                    info!("Job {job_id} cancelled during politeness delay");
                    return Ok(());
                }
            }
        }

        // Guarded finalize: a no-op when the job was cancelled during the
        // final iteration, so a cancelled job never becomes completed.
        if finalize_job(&self.pool, job_id, JobStatus::Completed, None).await? {
            info!("Job {job_id} completed");
        } else {
            info!("Job {job_id} reached a terminal state before finalize; leaving as-is");
        }
        Ok(())
    }

    async fn is_cancelled(&self, job_id: i64) -> Result<bool, JobError> {
        match fetch_status(&self.pool, job_id).await? {
            Some(JobStatus::Cancelled) => Ok(true),
            // A deleted job row means there is nothing left to update
            None => Ok(true),
            Some(_) => Ok(false),
        }
    }
}
