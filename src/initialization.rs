//! Application initialization: logger, HTTP client, and fetch engine.
//!
//! Everything here is constructed once at process start and passed in
//! explicitly. There are no module-level client singletons; tests build
//! their own engines with stub configurations.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use colored::*;
use log::LevelFilter;
use reqwest::ClientBuilder;

use crate::config::{LogFormat, ServiceKeys};
use crate::error_handling::{ErrorStats, InitializationError};
use crate::fetch::{BrowserConfig, BrowserFetcher, HttpFetcher, ProxyConfig, ProxyFetcher};
use crate::strategy::FetchEngine;

/// TCP connection timeout for all outbound requests, in seconds. The
/// per-attempt timeouts in the adapters bound the whole request; this just
/// fails unreachable hosts faster.
const TCP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Initializes the logger with the specified level and format.
///
/// Configures `env_logger` with custom formatting. Supports both plain text
/// (with colors) and JSON formats for structured logging.
///
/// The logger reads from the `RUST_LOG` environment variable by default, but
/// the provided `level` parameter will override it.
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    colored::control::set_override(true);

    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(level);
    builder.filter_module("html5ever", LevelFilter::Error);
    builder.filter_module("sqlx", LevelFilter::Info);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("selectors", LevelFilter::Warn);
    builder.filter_module("page_harvest", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{{\"ts\":{},\"level\":\"{}\",\"target\":\"{}\",\"msg\":{}}}",
                    chrono::Utc::now().timestamp_millis(),
                    record.level(),
                    record.target(),
                    serde_json::to_string(&record.args().to_string())
                        .unwrap_or_else(|_| "\"\"".into())
                )
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                let level = record.level();
                let colored_level = match level {
                    log::Level::Error => level.to_string().red(),
                    log::Level::Warn => level.to_string().yellow(),
                    log::Level::Info => level.to_string().green(),
                    log::Level::Debug => level.to_string().blue(),
                    log::Level::Trace => level.to_string().purple(),
                };

                writeln!(
                    buf,
                    "{} [{}] {}",
                    record.target().cyan(),
                    colored_level,
                    record.args()
                )
            });
        }
    }

    // try_init() instead of init() so tests can initialize more than once
    builder.try_init().map_err(InitializationError::from)?;

    Ok(())
}

/// Initializes the shared HTTP client.
///
/// Redirect following is enabled (up to 10 hops); per-attempt timeouts are
/// enforced by the adapters rather than at the client level so the direct
/// and service-backed strategies can use different budgets.
pub fn init_client(user_agent: &str) -> Result<Arc<reqwest::Client>, InitializationError> {
    let client = ClientBuilder::new()
        .user_agent(user_agent.to_string())
        .connect_timeout(Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?;
    Ok(Arc::new(client))
}

/// Builds the fetch engine from one shared client and environment keys.
///
/// Service adapters whose API key is absent stay constructed but report
/// themselves unconfigured, which removes them from method ordering.
pub fn init_engine(
    client: Arc<reqwest::Client>,
    keys: &ServiceKeys,
    error_stats: Arc<ErrorStats>,
) -> FetchEngine {
    FetchEngine::new(
        HttpFetcher::new(Arc::clone(&client)),
        ProxyFetcher::new(Arc::clone(&client), ProxyConfig::from_keys(keys)),
        BrowserFetcher::new(client, BrowserConfig::from_keys(keys)),
        error_stats,
    )
}
