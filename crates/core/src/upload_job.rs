//! Upload job model and the pure helpers the status reader is built on.
//!
//! The processing backend owns job state; this module only describes it and
//! provides the id-list parsing and recent-job ordering used by the proxy.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::types::{JobId, Timestamp};

/// Number of jobs returned by the recent-jobs listing when no limit is given.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Lifecycle of an upload job.
///
/// Backend vocabularies vary, so a few synonyms are folded into the four
/// states the tracker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[serde(alias = "queued", alias = "pending")]
    Uploading,
    #[serde(alias = "running")]
    Processing,
    Completed,
    #[serde(alias = "cancelled", alias = "canceled", alias = "error")]
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Completed and failed jobs never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row counters reported by the backend.
///
/// `processed + failed + skipped <= total` once `total` is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    #[serde(default)]
    pub processed: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub skipped: u32,
}

impl JobProgress {
    /// Rows the backend has finished with, successfully or not.
    pub fn settled(&self) -> u32 {
        self.processed + self.failed + self.skipped
    }

    /// Completion ratio in `0.0..=1.0`; zero while the total is unknown.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (f64::from(self.settled()) / f64::from(self.total)).min(1.0)
    }
}

/// A spreadsheet-processing job as seen by clients.
///
/// Serializes camelCase; deserialization also accepts the backend's
/// snake_case keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadJob {
    #[serde(alias = "job_id")]
    pub id: JobId,
    #[serde(default, alias = "file_name")]
    pub file_name: String,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: JobProgress,
    #[serde(default = "chrono::Utc::now", alias = "created_at")]
    pub created_at: Timestamp,
    #[serde(default, alias = "branch_id")]
    pub branch_id: String,
    #[serde(default, alias = "error_message", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl UploadJob {
    /// A freshly submitted job, before the backend has reported anything.
    pub fn submitted(
        id: impl Into<JobId>,
        file_name: impl Into<String>,
        branch_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            status: JobStatus::Uploading,
            progress: JobProgress::default(),
            created_at: chrono::Utc::now(),
            branch_id: branch_id.into(),
            error_message: None,
        }
    }
}

/// Split a comma-separated id list, trimming whitespace and dropping blanks.
pub fn parse_id_list(raw: &str) -> Vec<JobId> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Creation timestamp of a raw backend job entry, if it carries a parsable one.
pub fn created_at_of(job: &serde_json::Value) -> Option<Timestamp> {
    let raw = job
        .get("created_at")
        .or_else(|| job.get("createdAt"))?
        .as_str()?;
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

/// Newest-first ordering, truncated to `limit`.
///
/// Entries without a usable timestamp sort after every dated entry and keep
/// their relative order.
pub fn select_recent(mut jobs: Vec<serde_json::Value>, limit: usize) -> Vec<serde_json::Value> {
    jobs.sort_by(|a, b| match (created_at_of(a), created_at_of(b)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    jobs.truncate(limit);
    jobs
}
