//! Batch-job persistence: creation, guarded status transitions, counter
//! patches, and queries.
//!
//! The job row is the only shared mutable resource per job. It is written
//! by the single coordinator task that owns the job (read-then-patch), plus
//! the cancel operation which may flip the status from any other task. All
//! status transitions go through guarded `UPDATE ... WHERE status IN (...)`
//! statements so a terminal state can never be left again, whoever the
//! writer is.

use sqlx::SqlitePool;

use crate::error_handling::{DatabaseError, JobError};
use crate::storage::models::{BatchJobRow, JobStatus, JobType, UrlEntry};

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Creates a batch job at status `pending` with zero progress counters.
///
/// Returns the new job id.
pub async fn create_job(
    pool: &SqlitePool,
    owner: &str,
    job_type: JobType,
    urls: &[UrlEntry],
) -> Result<i64, DatabaseError> {
    let now = now_ms();
    let urls_json = serde_json::to_string(urls).unwrap_or_else(|_| "[]".to_string());
    let result = sqlx::query(
        "INSERT INTO scrape_jobs
            (owner, job_type, status, total_urls, completed_urls, failed_urls,
             urls, record_ids, started_at, updated_at)
         VALUES (?, ?, 'pending', ?, 0, 0, ?, '[]', ?, ?)",
    )
    .bind(owner)
    .bind(job_type.as_str())
    .bind(urls.len() as i64)
    .bind(urls_json)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    Ok(result.last_insert_rowid())
}

/// Loads a full job row.
pub async fn get_job(pool: &SqlitePool, id: i64) -> Result<Option<BatchJobRow>, DatabaseError> {
    sqlx::query_as::<_, BatchJobRow>("SELECT * FROM scrape_jobs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::SqlError)
}

/// Reads just the job status. This is the coordinator's cancellation
/// checkpoint, so it stays a single-column read.
pub async fn fetch_status(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<JobStatus>, DatabaseError> {
    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM scrape_jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(DatabaseError::SqlError)?;
    Ok(status.as_deref().and_then(JobStatus::parse))
}

/// Moves a job to `in_progress`.
///
/// Returns false when the job is already terminal (or missing), in which
/// case the coordinator must not run it. A job already `in_progress` is
/// accepted so a restarted coordinator can resume from persisted state.
pub async fn mark_in_progress(pool: &SqlitePool, id: i64) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        "UPDATE scrape_jobs SET status = 'in_progress', updated_at = ?
         WHERE id = ? AND status IN ('pending', 'in_progress')",
    )
    .bind(now_ms())
    .bind(id)
    .execute(pool)
    .await
    .map_err(DatabaseError::SqlError)?;
    Ok(result.rows_affected() > 0)
}

/// Records one URL outcome: bumps the matching counter and, for a success,
/// appends the created record reference. Persisted immediately so observers
/// see live progress.
pub async fn record_url_outcome(
    pool: &SqlitePool,
    id: i64,
    success: bool,
    record_id: Option<i64>,
) -> Result<(), DatabaseError> {
    let record_ids = match record_id {
        Some(rid) => {
            let current: Option<String> =
                sqlx::query_scalar("SELECT record_ids FROM scrape_jobs WHERE id = ?")
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .map_err(DatabaseError::SqlError)?;
            let mut ids: Vec<i64> = current
                .as_deref()
                .and_then(|s| serde_json::from_str(s).ok())
                .unwrap_or_default();
            ids.push(rid);
            Some(serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string()))
        }
        None => None,
    };

    let counter_sql = if success {
        "UPDATE scrape_jobs
         SET completed_urls = completed_urls + 1,
             record_ids = COALESCE(?, record_ids),
             updated_at = ?
         WHERE id = ?"
    } else {
        "UPDATE scrape_jobs
         SET failed_urls = failed_urls + 1,
             record_ids = COALESCE(?, record_ids),
             updated_at = ?
         WHERE id = ?"
    };

    sqlx::query(counter_sql)
        .bind(record_ids)
        .bind(now_ms())
        .bind(id)
        .execute(pool)
        .await
        .map_err(DatabaseError::SqlError)?;
    Ok(())
}

/// Finalizes a job to `completed` or `failed`.
///
/// Guarded: returns false without writing when the job has already reached
/// a terminal state (e.g. cancelled during the final iteration).
pub async fn finalize_job(
    pool: &SqlitePool,
    id: i64,
    status: JobStatus,
    error: Option<&str>,
) -> Result<bool, DatabaseError> {
    debug_assert!(matches!(status, JobStatus::Completed | JobStatus::Failed));
    let now = now_ms();
    let result = sqlx::query(
        "UPDATE scrape_jobs SET status = ?, error = ?, completed_at = ?, updated_at = ?
         WHERE id = ? AND status IN ('pending', 'in_progress')",
    )
    .bind(status.as_str())
    .bind(error)
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await
    .map_err(DatabaseError::SqlError)?;
    Ok(result.rows_affected() > 0)
}

/// Requests cancellation of a pending or in-progress job.
///
/// Cancellation is cooperative: this only flips the persisted status, and
/// the coordinator observes it at its next checkpoint. Cancelling a job
/// already in a terminal state is an error.
pub async fn cancel_job(pool: &SqlitePool, id: i64) -> Result<(), JobError> {
    let Some(job) = get_job(pool, id).await? else {
        return Err(JobError::NotFound(id));
    };
    if let Some(status) = job.status() {
        if status.is_terminal() {
            return Err(JobError::CannotCancel(status.as_str().to_string()));
        }
    }

    let now = now_ms();
    let result = sqlx::query(
        "UPDATE scrape_jobs SET status = 'cancelled', completed_at = ?, updated_at = ?
         WHERE id = ? AND status IN ('pending', 'in_progress')",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await
    .map_err(DatabaseError::from)?;

    if result.rows_affected() == 0 {
        // Lost a race with the coordinator finalizing the job
        let status = fetch_status(pool, id)
            .await?
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        return Err(JobError::CannotCancel(status));
    }
    Ok(())
}

/// Lists jobs, newest first.
///
/// `owner` filters to one identity; `active_only` keeps just
/// pending/in-progress jobs.
pub async fn jobs_for_owner(
    pool: &SqlitePool,
    owner: Option<&str>,
    active_only: bool,
) -> Result<Vec<BatchJobRow>, DatabaseError> {
    let mut sql = String::from("SELECT * FROM scrape_jobs");
    let mut clauses: Vec<&str> = Vec::new();
    if owner.is_some() {
        clauses.push("owner = ?");
    }
    if active_only {
        clauses.push("status IN ('pending', 'in_progress')");
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY started_at DESC, id DESC");

    let mut query = sqlx::query_as::<_, BatchJobRow>(&sql);
    if let Some(owner) = owner {
        query = query.bind(owner);
    }
    query.fetch_all(pool).await.map_err(DatabaseError::SqlError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::run_migrations;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    #[tokio::test]
    async fn test_create_and_get_job() {
        let pool = test_pool().await;
        let urls = vec![
            UrlEntry::new("https://a.example.gov"),
            UrlEntry::new("https://b.example.gov"),
        ];
        let id = create_job(&pool, "alice", JobType::Multiple, &urls)
            .await
            .unwrap();

        let job = get_job(&pool, id).await.unwrap().unwrap();
        assert_eq!(job.status(), Some(JobStatus::Pending));
        assert_eq!(job.total_urls, 2);
        assert_eq!(job.completed_urls, 0);
        assert_eq!(job.failed_urls, 0);
        assert_eq!(job.url_entries(), urls);
        assert!(job.record_id_list().is_empty());
    }

    #[tokio::test]
    async fn test_counter_patches_and_record_refs() {
        let pool = test_pool().await;
        let id = create_job(&pool, "alice", JobType::Single, &[UrlEntry::new("u")])
            .await
            .unwrap();

        record_url_outcome(&pool, id, true, Some(7)).await.unwrap();
        record_url_outcome(&pool, id, false, None).await.unwrap();

        let job = get_job(&pool, id).await.unwrap().unwrap();
        assert_eq!(job.completed_urls, 1);
        assert_eq!(job.failed_urls, 1);
        assert_eq!(job.record_id_list(), vec![7]);
    }

    #[tokio::test]
    async fn test_cancel_guards_terminal_states() {
        let pool = test_pool().await;
        let id = create_job(&pool, "alice", JobType::Single, &[UrlEntry::new("u")])
            .await
            .unwrap();

        mark_in_progress(&pool, id).await.unwrap();
        finalize_job(&pool, id, JobStatus::Completed, None)
            .await
            .unwrap();

        let err = cancel_job(&pool, id).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot cancel job with status: completed"
        );

        let err = cancel_job(&pool, id + 1).await.unwrap_err();
        assert!(matches!(err, JobError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_finalize_refuses_after_cancel() {
        let pool = test_pool().await;
        let id = create_job(&pool, "alice", JobType::Single, &[UrlEntry::new("u")])
            .await
            .unwrap();

        cancel_job(&pool, id).await.unwrap();
        let finalized = finalize_job(&pool, id, JobStatus::Completed, None)
            .await
            .unwrap();
        assert!(!finalized);

        let job = get_job(&pool, id).await.unwrap().unwrap();
        assert_eq!(job.status(), Some(JobStatus::Cancelled));
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_jobs_for_owner_filters_and_orders() {
        let pool = test_pool().await;
        let a = create_job(&pool, "alice", JobType::Single, &[UrlEntry::new("u")])
            .await
            .unwrap();
        let b = create_job(&pool, "alice", JobType::Single, &[UrlEntry::new("v")])
            .await
            .unwrap();
        let _c = create_job(&pool, "bob", JobType::Single, &[UrlEntry::new("w")])
            .await
            .unwrap();

        mark_in_progress(&pool, a).await.unwrap();
        finalize_job(&pool, a, JobStatus::Completed, None)
            .await
            .unwrap();

        let all = jobs_for_owner(&pool, Some("alice"), false).await.unwrap();
        assert_eq!(all.len(), 2);
        // Newest first
        assert_eq!(all[0].id, b);

        let active = jobs_for_owner(&pool, Some("alice"), true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b);
    }
}
