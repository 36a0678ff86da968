//! File-backed database pool tests: creation, WAL mode, and reopening an
//! existing database.

use page_harvest::run_migrations;
use page_harvest::storage::init_db_pool_with_path;
use page_harvest::storage::jobs::{create_job, get_job};
use page_harvest::storage::models::{JobStatus, JobType, UrlEntry};

#[tokio::test]
async fn test_pool_creates_file_and_survives_reopen() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("page_harvest_test.db");

    let job_id = {
        let pool = init_db_pool_with_path(&db_path)
            .await
            .expect("Failed to initialize pool");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let job_id = create_job(
            &pool,
            "alice",
            JobType::Single,
            &[UrlEntry::new("https://example.gov/bids")],
        )
        .await
        .unwrap();
        pool.close().await;
        job_id
    };

    assert!(db_path.exists(), "database file must exist on disk");

    // Reopen: data persists and migrations are idempotent
    let pool = init_db_pool_with_path(&db_path)
        .await
        .expect("Failed to reopen pool");
    run_migrations(&pool)
        .await
        .expect("Migrations must be idempotent");

    let job = get_job(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status(), Some(JobStatus::Pending));
    assert_eq!(job.owner, "alice");
    pool.close().await;
}
