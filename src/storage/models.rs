//! Row types and persisted enums for jobs and scrape records.

use serde::{Deserialize, Serialize};

/// Batch-job lifecycle states.
///
/// Transitions are monotonic: `Pending -> InProgress -> {Completed | Failed
/// | Cancelled}`. The three terminal states are absorbing; guarded SQL
/// updates in [`crate::storage::jobs`] make sure a stale writer can never
/// move a job out of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "in_progress" => Some(JobStatus::InProgress),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of URL set a batch job covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Single,
    Multiple,
    AllApproved,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Single => "single",
            JobType::Multiple => "multiple",
            JobType::AllApproved => "all_approved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single" => Some(JobType::Single),
            "multiple" => Some(JobType::Multiple),
            "all_approved" => Some(JobType::AllApproved),
            _ => None,
        }
    }
}

/// Scrape-record lifecycle states.
///
/// A record is created `InProgress` before the fetch begins and always ends
/// in `Completed` or `Failed`, whatever the fetch pipeline did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    InProgress,
    Completed,
    Failed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::InProgress => "in_progress",
            RecordStatus::Completed => "completed",
            RecordStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(RecordStatus::InProgress),
            "completed" => Some(RecordStatus::Completed),
            "failed" => Some(RecordStatus::Failed),
            _ => None,
        }
    }
}

/// One URL plus its per-URL context within a batch job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UrlEntry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital: Option<String>,
    /// Optional linkage id back to the source link row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_id: Option<String>,
}

impl UrlEntry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: None,
            capital: None,
            link_id: None,
        }
    }
}

/// LLM token accounting attached to a scrape record.
///
/// The heuristic analyzer writes zeros; an external agent layer may
/// overwrite these via the records API.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

/// A `scrape_jobs` row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BatchJobRow {
    pub id: i64,
    pub owner: String,
    pub job_type: String,
    pub status: String,
    pub total_urls: i64,
    pub completed_urls: i64,
    pub failed_urls: i64,
    /// JSON array of [`UrlEntry`].
    pub urls: String,
    /// JSON array of created record ids.
    pub record_ids: String,
    pub error: Option<String>,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub updated_at: i64,
}

impl BatchJobRow {
    pub fn status(&self) -> Option<JobStatus> {
        JobStatus::parse(&self.status)
    }

    pub fn url_entries(&self) -> Vec<UrlEntry> {
        serde_json::from_str(&self.urls).unwrap_or_default()
    }

    pub fn record_id_list(&self) -> Vec<i64> {
        serde_json::from_str(&self.record_ids).unwrap_or_default()
    }
}

/// A `scrape_records` row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeRecordRow {
    pub id: i64,
    pub url: String,
    pub state: Option<String>,
    pub capital: Option<String>,
    pub link_id: Option<String>,
    pub status: String,
    pub page_type: Option<String>,
    pub method: Option<String>,
    /// JSON array of method names, in attempt order.
    pub methods_attempted: Option<String>,
    pub fallback_used: i64,
    pub title: Option<String>,
    /// JSON object of extracted procurement fields.
    pub extracted_fields: Option<String>,
    pub data_quality: Option<String>,
    pub data_completeness: Option<f64>,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub duration_ms: Option<i64>,
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ScrapeRecordRow {
    pub fn status(&self) -> Option<RecordStatus> {
        RecordStatus::parse(&self.status)
    }
}
