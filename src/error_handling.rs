use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

use crate::models::FetchResult;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

/// User-facing errors from batch-job operations.
#[derive(Error, Debug)]
pub enum JobError {
    /// The job id does not exist.
    #[error("Job not found: {0}")]
    NotFound(i64),

    /// Cancellation requested for a job already in a terminal state.
    #[error("Cannot cancel job with status: {0}")]
    CannotCancel(String),

    /// Underlying database failure.
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for JobError {
    fn from(e: sqlx::Error) -> Self {
        JobError::Database(DatabaseError::SqlError(e))
    }
}

/// Failure modes observed while fetching URLs.
///
/// This enum categorizes fetch outcomes for tracking and reporting purposes.
/// Blocking conditions (Cloudflare, CAPTCHA, auth walls) are counted here as
/// well even though they are not transport errors, because they are the
/// conditions the fallback ladder exists to climb over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    HttpTimeoutError,
    HttpConnectError,
    HttpRequestError,
    CloudflareChallenge,
    CaptchaDetected,
    AuthRequired,
    JavascriptRequired,
    HttpClientError,
    HttpServerError,
    EmptyContent,
    ServiceNotConfigured,
    AllMethodsFailed,
    OtherError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::HttpTimeoutError => "HTTP timeout",
            ErrorType::HttpConnectError => "HTTP connect error",
            ErrorType::HttpRequestError => "HTTP request error",
            ErrorType::CloudflareChallenge => "Cloudflare challenge",
            ErrorType::CaptchaDetected => "CAPTCHA detected",
            ErrorType::AuthRequired => "Authentication required",
            ErrorType::JavascriptRequired => "JavaScript rendering required",
            ErrorType::HttpClientError => "HTTP 4xx response",
            ErrorType::HttpServerError => "HTTP 5xx response",
            ErrorType::EmptyContent => "Empty or near-empty content",
            ErrorType::ServiceNotConfigured => "Fetch service not configured",
            ErrorType::AllMethodsFailed => "All scraping methods failed",
            ErrorType::OtherError => "Other error",
        }
    }
}

/// Thread-safe error statistics tracker.
///
/// Tracks the count of each error type using atomic counters, allowing
/// concurrent access from multiple tasks. All error types are initialized to
/// zero on creation.
pub struct ErrorStats {
    errors: HashMap<ErrorType, AtomicUsize>,
}

impl ErrorStats {
    pub fn new() -> Self {
        let mut errors = HashMap::new();
        for error in ErrorType::iter() {
            errors.insert(error, AtomicUsize::new(0));
        }
        ErrorStats { errors }
    }

    pub fn increment(&self, error: ErrorType) {
        // All ErrorType variants are initialized in new(), so unwrap() is safe
        self.errors
            .get(&error)
            .unwrap()
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_count(&self, error: ErrorType) -> usize {
        // All ErrorType variants are initialized in new(), so unwrap() is safe
        self.errors.get(&error).unwrap().load(Ordering::SeqCst)
    }

    /// Records the dominant failure condition of a fetch attempt.
    ///
    /// No-op for successful results.
    pub fn record_fetch(&self, result: &FetchResult) {
        if result.success {
            return;
        }
        self.increment(categorize_fetch_result(result));
    }
}

impl Default for ErrorStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Categorizes a failed fetch result into its dominant failure condition.
///
/// Blocking conditions win over status-code buckets: a 403 behind a CAPTCHA
/// counts as a CAPTCHA, since that is what drives the escalation decision.
pub fn categorize_fetch_result(result: &FetchResult) -> ErrorType {
    let meta = &result.metadata;
    if meta.cloudflare_detected {
        return ErrorType::CloudflareChallenge;
    }
    if meta.captcha_detected {
        return ErrorType::CaptchaDetected;
    }
    if matches!(result.status_code, Some(401) | Some(403)) {
        return ErrorType::AuthRequired;
    }
    if meta.requires_javascript {
        return ErrorType::JavascriptRequired;
    }
    if let Some(status) = result.status_code {
        if status >= 500 {
            return ErrorType::HttpServerError;
        }
        if status >= 400 {
            return ErrorType::HttpClientError;
        }
        // A 2xx that still failed the success gate means too little text
        return ErrorType::EmptyContent;
    }
    // No status at all: transport-level failure, sort by error message
    let msg = result
        .error
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    if msg.contains("timeout") {
        ErrorType::HttpTimeoutError
    } else if msg.contains("connect") || msg.contains("dns") || msg.contains("resolve") {
        ErrorType::HttpConnectError
    } else if msg.contains("not configured") || msg.contains("api key") {
        ErrorType::ServiceNotConfigured
    } else if msg.contains("all scraping methods failed") {
        ErrorType::AllMethodsFailed
    } else if msg.is_empty() {
        ErrorType::OtherError
    } else {
        ErrorType::HttpRequestError
    }
}
