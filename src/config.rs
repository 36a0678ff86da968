use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use crate::models::ScrapingMethod;

// constants (used as defaults)
pub const LOGGING_INTERVAL_SECS: u64 = 5;
pub const DB_PATH: &str = "./page_harvest.db";

// Fetch timeouts
/// Hard timeout for a direct HTTP fetch attempt.
pub const HTTP_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Default service-side timeout for the proxy-rendering and browser services,
/// in milliseconds. Both services accept a caller-supplied override.
pub const SERVICE_TIMEOUT_MS: u64 = 60_000;

// Content thresholds
/// Minimum extracted-text length for a fetch to count as successful.
/// Below this the page is treated as empty (or a challenge shell).
pub const MIN_EXTRACTED_TEXT_LENGTH: usize = 100;
/// Raw HTML is trimmed to this many characters before storage.
pub const MAX_RAW_HTML_LENGTH: usize = 100_000;
/// Extracted plain text is trimmed to this many characters.
pub const MAX_EXTRACTED_TEXT_LENGTH: usize = 50_000;
/// JS-rendering heuristic: substantial markup with almost no visible text.
/// A body longer than this with less than `JS_DETECTION_TEXT_THRESHOLD`
/// characters of text is assumed to be client-rendered.
pub const JS_DETECTION_HTML_THRESHOLD: usize = 5_000;
pub const JS_DETECTION_TEXT_THRESHOLD: usize = 500;

// Fallback strategy
/// Attempts per scraping method before escalating to the next one.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

// Batch jobs
/// Pause between successive URLs within one batch job, to avoid hammering
/// target sites. Injectable via `CoordinatorConfig` for tests.
pub const POLITENESS_DELAY: Duration = Duration::from_secs(2);

/// Default User-Agent string for HTTP requests.
///
/// Uses a generic Chrome-like string without a specific version number to avoid
/// becoming outdated. The pattern mimics a modern Chrome browser on Windows.
/// Users can override this via the `--user-agent` CLI flag.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Accept header sent with direct HTTP fetches, matching what a desktop
/// browser advertises for a top-level navigation.
pub const ACCEPT_HEADER: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

// Environment variable names for the paid fetch services.
// Absence of a key deterministically disables that adapter.
pub const PROXY_API_KEY_ENV: &str = "PROXY_RENDER_API_KEY";
pub const PROXY_BASE_URL_ENV: &str = "PROXY_RENDER_BASE_URL";
pub const BROWSER_API_KEY_ENV: &str = "BROWSER_SERVICE_API_KEY";
pub const BROWSER_BASE_URL_ENV: &str = "BROWSER_SERVICE_BASE_URL";

/// Default endpoint for the proxy-rendering service.
pub const DEFAULT_PROXY_BASE_URL: &str = "https://app.scrapingbee.com/api/v1/";
/// Default endpoint for the headless-browser service.
pub const DEFAULT_BROWSER_BASE_URL: &str = "https://chrome.browserless.io";

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace). Used with the `--log-level` CLI option.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Plain,
    Json,
}

/// API keys and endpoints for the paid fetch services, read from the
/// environment once at startup. A `None` key disables that adapter: it is
/// skipped in method ordering and never attempted.
#[derive(Clone, Debug, Default)]
pub struct ServiceKeys {
    pub proxy_api_key: Option<String>,
    pub proxy_base_url: Option<String>,
    pub browser_api_key: Option<String>,
    pub browser_base_url: Option<String>,
}

impl ServiceKeys {
    /// Reads service configuration from the environment.
    ///
    /// Empty values are treated the same as unset ones so that
    /// `PROXY_RENDER_API_KEY=` in a `.env` file does not enable the adapter.
    pub fn from_env() -> Self {
        fn non_empty(var: &str) -> Option<String> {
            std::env::var(var).ok().filter(|v| !v.trim().is_empty())
        }
        Self {
            proxy_api_key: non_empty(PROXY_API_KEY_ENV),
            proxy_base_url: non_empty(PROXY_BASE_URL_ENV),
            browser_api_key: non_empty(BROWSER_API_KEY_ENV),
            browser_base_url: non_empty(BROWSER_BASE_URL_ENV),
        }
    }
}

/// Command-line options and configuration.
///
/// This struct is automatically generated by `clap` from the field attributes.
/// All options have sensible defaults and can be overridden via command-line flags.
///
/// # Examples
///
/// ```bash
/// # Fetch a batch of URLs listed in a file
/// page_harvest run urls.txt --owner alice
///
/// # Fetch one URL and print the tool-surface JSON
/// page_harvest fetch https://example.gov/bids --method http-fetch
///
/// # Inspect and cancel jobs
/// page_harvest jobs --owner alice --active
/// page_harvest cancel 42
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "page_harvest",
    about = "Fetches procurement webpages via layered scraping strategies and tracks batch-job outcomes."
)]
pub struct Config {
    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain, global = true)]
    pub log_format: LogFormat,

    /// Database path (SQLite file)
    #[arg(long, value_parser, default_value = DB_PATH, global = true)]
    pub db_path: PathBuf,

    /// HTTP User-Agent header value.
    ///
    /// Defaults to a Chrome-like browser string. Can be overridden to match
    /// specific browser versions or patterns.
    #[arg(long, default_value = DEFAULT_USER_AGENT, global = true)]
    pub user_agent: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of the CLI binary.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a batch job from a URL list file and execute it to completion.
    ///
    /// The file contains one URL per line; blank lines and lines starting
    /// with `#` are skipped. Each line may carry optional state and capital
    /// context separated by tabs: `URL<TAB>STATE<TAB>CAPITAL`.
    Run {
        /// File to read (use "-" for stdin)
        #[arg(value_parser)]
        file: PathBuf,

        /// Identity that owns the created job
        #[arg(long, default_value = "cli")]
        owner: String,

        /// Preferred scraping method to try first
        #[arg(long, value_enum)]
        method: Option<ScrapingMethod>,

        /// Disable escalation to further methods after a failure
        #[arg(long)]
        no_fallback: bool,
    },

    /// Fetch a single URL through the fallback orchestrator and print the
    /// full result as JSON (the same surface exposed to the agent layer).
    Fetch {
        /// URL to fetch
        url: String,

        /// Preferred scraping method to try first
        #[arg(long, value_enum)]
        method: Option<ScrapingMethod>,

        /// Disable escalation to further methods after a failure
        #[arg(long)]
        no_fallback: bool,
    },

    /// List batch jobs.
    Jobs {
        /// Only show jobs owned by this identity
        #[arg(long)]
        owner: Option<String>,

        /// Only show pending/in-progress jobs
        #[arg(long)]
        active: bool,
    },

    /// Request cancellation of a pending or in-progress batch job.
    Cancel {
        /// Job identifier, as printed by `run` and `jobs`
        job_id: i64,
    },
}
