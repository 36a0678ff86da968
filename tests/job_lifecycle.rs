//! Batch-job lifecycle tests: counter invariants, per-URL error
//! containment, and terminal-state behavior.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use page_harvest::coordinator::{BatchCoordinator, CoordinatorConfig};
use page_harvest::error_handling::JobError;
use page_harvest::storage::jobs::{cancel_job, create_job, get_job, jobs_for_owner};
use page_harvest::storage::models::{JobStatus, JobType};

use helpers::{create_test_pool, failed_outcome, ok_outcome, url_entries, ScriptedScraper};

fn zero_delay() -> CoordinatorConfig {
    CoordinatorConfig {
        politeness_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_all_urls_succeed() {
    let pool = create_test_pool().await;
    let scraper = Arc::new(ScriptedScraper::new(vec![
        ok_outcome(1),
        ok_outcome(2),
        ok_outcome(3),
    ]));
    let coordinator = BatchCoordinator::new(Arc::clone(&pool), scraper, zero_delay());

    let job_id = create_job(&pool, "alice", JobType::Multiple, &url_entries(3))
        .await
        .unwrap();
    coordinator.run_job(job_id).await.unwrap();

    let job = get_job(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status(), Some(JobStatus::Completed));
    assert_eq!(job.completed_urls, 3);
    assert_eq!(job.failed_urls, 0);
    assert_eq!(job.completed_urls + job.failed_urls, job.total_urls);
    assert_eq!(job.record_id_list(), vec![1, 2, 3]);
    assert!(job.completed_at.is_some());
}

#[tokio::test]
async fn test_scraper_error_counts_as_failure_and_batch_continues() {
    // URL #2 "throws": the job must still finish with 2 ok / 1 failed
    let pool = create_test_pool().await;
    let scraper = Arc::new(ScriptedScraper::new(vec![
        ok_outcome(1),
        Err(anyhow::anyhow!("downstream response was malformed")),
        ok_outcome(3),
    ]));
    let coordinator = BatchCoordinator::new(Arc::clone(&pool), Arc::clone(&scraper) as _, zero_delay());

    let job_id = create_job(&pool, "alice", JobType::Multiple, &url_entries(3))
        .await
        .unwrap();
    coordinator.run_job(job_id).await.unwrap();

    let job = get_job(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status(), Some(JobStatus::Completed));
    assert_eq!(job.completed_urls, 2);
    assert_eq!(job.failed_urls, 1);
    assert_eq!(scraper.call_count(), 3);
}

#[tokio::test]
async fn test_fully_failed_job_still_completes() {
    // "Job ran and every URL failed" is distinct from "job crashed":
    // the status is completed with zero successes
    let pool = create_test_pool().await;
    let scraper = Arc::new(ScriptedScraper::new(vec![
        failed_outcome(),
        failed_outcome(),
    ]));
    let coordinator = BatchCoordinator::new(Arc::clone(&pool), scraper, zero_delay());

    let job_id = create_job(&pool, "alice", JobType::Multiple, &url_entries(2))
        .await
        .unwrap();
    coordinator.run_job(job_id).await.unwrap();

    let job = get_job(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status(), Some(JobStatus::Completed));
    assert_eq!(job.completed_urls, 0);
    assert_eq!(job.failed_urls, 2);
}

#[tokio::test]
async fn test_counter_invariant_holds_throughout() {
    // completed + failed never exceeds total, and equals it at completion
    let pool = create_test_pool().await;
    let scraper = Arc::new(ScriptedScraper::new(vec![
        ok_outcome(1),
        failed_outcome(),
        Err(anyhow::anyhow!("boom")),
        ok_outcome(4),
    ]));
    let coordinator = BatchCoordinator::new(Arc::clone(&pool), scraper, zero_delay());

    let job_id = create_job(&pool, "alice", JobType::Multiple, &url_entries(4))
        .await
        .unwrap();

    let job = get_job(&pool, job_id).await.unwrap().unwrap();
    assert!(job.completed_urls + job.failed_urls <= job.total_urls);

    coordinator.run_job(job_id).await.unwrap();

    let job = get_job(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.completed_urls + job.failed_urls, job.total_urls);
    assert_eq!(job.completed_urls, 2);
    assert_eq!(job.failed_urls, 2);
}

#[tokio::test]
async fn test_cancel_terminal_job_is_an_error() {
    let pool = create_test_pool().await;
    let scraper = Arc::new(ScriptedScraper::new(vec![ok_outcome(1)]));
    let coordinator = BatchCoordinator::new(Arc::clone(&pool), scraper, zero_delay());

    let job_id = create_job(&pool, "alice", JobType::Single, &url_entries(1))
        .await
        .unwrap();
    coordinator.run_job(job_id).await.unwrap();

    let err = cancel_job(&pool, job_id).await.unwrap_err();
    assert!(matches!(err, JobError::CannotCancel(_)));
    assert_eq!(err.to_string(), "Cannot cancel job with status: completed");

    // Cancelling twice is also an error
    let job_id = create_job(&pool, "alice", JobType::Single, &url_entries(1))
        .await
        .unwrap();
    cancel_job(&pool, job_id).await.unwrap();
    let err = cancel_job(&pool, job_id).await.unwrap_err();
    assert_eq!(err.to_string(), "Cannot cancel job with status: cancelled");
}

#[tokio::test]
async fn test_job_queries_by_owner_and_activity() {
    let pool = create_test_pool().await;
    let scraper = Arc::new(ScriptedScraper::new(vec![ok_outcome(1)]));
    let coordinator = BatchCoordinator::new(Arc::clone(&pool), scraper, zero_delay());

    let done = create_job(&pool, "alice", JobType::Single, &url_entries(1))
        .await
        .unwrap();
    coordinator.run_job(done).await.unwrap();
    let waiting = create_job(&pool, "alice", JobType::Multiple, &url_entries(2))
        .await
        .unwrap();
    let other = create_job(&pool, "bob", JobType::Single, &url_entries(1))
        .await
        .unwrap();

    let alice_all = jobs_for_owner(&pool, Some("alice"), false).await.unwrap();
    assert_eq!(alice_all.len(), 2);
    // Sorted by start time descending
    assert_eq!(alice_all[0].id, waiting);
    assert_eq!(alice_all[1].id, done);

    let alice_active = jobs_for_owner(&pool, Some("alice"), true).await.unwrap();
    assert_eq!(alice_active.len(), 1);
    assert_eq!(alice_active[0].id, waiting);
    assert_eq!(alice_active[0].status(), Some(JobStatus::Pending));

    let everyone = jobs_for_owner(&pool, None, false).await.unwrap();
    assert_eq!(everyone.len(), 3);
    assert!(everyone.iter().any(|j| j.id == other));
}
