//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `page_harvest` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use page_harvest::config::Command;
use page_harvest::initialization::init_logger_with;
use page_harvest::storage::{cancel_job, init_db_pool_with_path, jobs_for_owner, run_migrations};
use page_harvest::{run_batch, run_single_fetch, Config, RunOptions};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env (service API keys live there)
    let _ = dotenvy::dotenv();

    let config = Config::parse();

    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    match config.command {
        Command::Run {
            file,
            owner,
            method,
            no_fallback,
        } => {
            let report = match run_batch(RunOptions {
                file,
                db_path: config.db_path,
                user_agent: config.user_agent,
                owner,
                preferred_method: method,
                enable_fallback: !no_fallback,
            })
            .await
            {
                Ok(report) => report,
                Err(e) => {
                    eprintln!("page_harvest error: {:#}", e);
                    process::exit(1);
                }
            };

            println!(
                "Job {} {}: {}/{} URL{} succeeded, {} failed in {:.1}s",
                report.job_id,
                report.status,
                report.completed,
                report.total_urls,
                if report.total_urls == 1 { "" } else { "s" },
                report.failed,
                report.elapsed_seconds
            );
            println!("Results saved in {}", report.db_path.display());
            Ok(())
        }

        Command::Fetch {
            url,
            method,
            no_fallback,
        } => {
            match run_single_fetch(&config.user_agent, &url, method, !no_fallback).await {
                Ok(value) => {
                    println!("{}", serde_json::to_string_pretty(&value)?);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("page_harvest error: {:#}", e);
                    process::exit(1);
                }
            }
        }

        Command::Jobs { owner, active } => {
            let pool = init_db_pool_with_path(&config.db_path)
                .await
                .context("Failed to open database")?;
            run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            let jobs = jobs_for_owner(&pool, owner.as_deref(), active)
                .await
                .context("Failed to query jobs")?;
            if jobs.is_empty() {
                println!("No jobs found.");
                return Ok(());
            }
            for job in jobs {
                println!(
                    "#{:<6} {:<12} {:<12} {:>4}/{:<4} ok, {} failed  owner={}",
                    job.id,
                    job.status,
                    job.job_type,
                    job.completed_urls,
                    job.total_urls,
                    job.failed_urls,
                    job.owner
                );
            }
            Ok(())
        }

        Command::Cancel { job_id } => {
            let pool = init_db_pool_with_path(&config.db_path)
                .await
                .context("Failed to open database")?;
            run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            match cancel_job(&pool, job_id).await {
                Ok(()) => {
                    println!("Job {job_id} cancelled.");
                    Ok(())
                }
                Err(e) => {
                    eprintln!("page_harvest error: {e}");
                    process::exit(1);
                }
            }
        }
    }
}
