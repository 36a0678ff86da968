//! page_harvest library: resilient webpage acquisition for procurement
//! pages.
//!
//! Three layered pieces, leaves first: a pure content classifier (block
//! detection + page-intent heuristics), three fetch adapters (direct HTTP,
//! proxy-rendering service, headless-browser service) behind a fallback
//! orchestrator that escalates on recoverable blocks, and a cancellable
//! batch-job coordinator that drives the orchestrator over a URL list with
//! per-URL outcomes persisted in SQLite.
//!
//! # Example
//!
//! ```no_run
//! use page_harvest::{run_batch, RunOptions};
//! use std::path::PathBuf;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let report = run_batch(RunOptions {
//!     file: PathBuf::from("urls.txt"),
//!     db_path: PathBuf::from("./page_harvest.db"),
//!     user_agent: page_harvest::config::DEFAULT_USER_AGENT.to_string(),
//!     owner: "cli".to_string(),
//!     preferred_method: None,
//!     enable_fallback: true,
//! })
//! .await?;
//! println!("{}/{} URLs succeeded", report.completed, report.total_urls);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

mod app;

pub mod agent_tool;
pub mod classifier;
pub mod config;
pub mod coordinator;
pub mod error_handling;
pub mod fetch;
pub mod initialization;
pub mod models;
pub mod quality;
pub mod run;
pub mod scrape;
pub mod storage;
pub mod strategy;

// Re-export public API
pub use config::{Command, Config, LogFormat, LogLevel, ServiceKeys};
pub use models::{FetchMetadata, FetchResult, ScrapingMethod, StrategyResult};
pub use run::{run_batch, run_single_fetch, BatchReport, RunOptions};
pub use storage::run_migrations;
pub use strategy::{should_escalate, FetchEngine, FetchOptions};
