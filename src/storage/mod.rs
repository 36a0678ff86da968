// storage/mod.rs
// Database operations module

pub mod jobs;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod records;

// Re-export commonly used items
pub use jobs::{cancel_job, create_job, get_job, jobs_for_owner};
pub use migrations::run_migrations;
pub use models::{BatchJobRow, JobStatus, JobType, RecordStatus, ScrapeRecordRow, UrlEntry};
pub use pool::{init_db_pool, init_db_pool_with_path};
