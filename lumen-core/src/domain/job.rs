//! Job domain types

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A generation job tracked by its remote identifier
///
/// `job_id` is assigned by the remote service at submission time and never
/// changes. `result_locations` is only populated once the job succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub result_locations: Vec<ResultLocation>,
}

impl Job {
    /// Creates a job with no results yet
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            result_locations: Vec::new(),
        }
    }

    /// First result location, if any
    pub fn primary_result(&self) -> Option<&ResultLocation> {
        self.result_locations.first()
    }
}

/// Location of a produced artifact (image, video, audio)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultLocation {
    pub url: String,
}

impl ResultLocation {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Whether the artifact looks like a video, judged by its extension
    pub fn is_video(&self) -> bool {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        [".mp4", ".webm", ".mov"]
            .iter()
            .any(|ext| path.to_ascii_lowercase().ends_with(ext))
    }
}

/// Normalized job status
///
/// The remote service uses a wider vocabulary (`queued`, `completed`, ...);
/// [`JobStatus::from_remote`] folds it into these four values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Terminal statuses never transition again
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    /// Lowercase name used on the wire and in logs
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    /// Normalizes a status string from the remote service
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// Returns `None` for words outside the known vocabulary.
    pub fn from_remote(raw: &str) -> Option<JobStatus> {
        let status = match raw.trim().to_ascii_lowercase().as_str() {
            "queued" | "pending" | "waiting" | "created" => JobStatus::Pending,
            "processing" | "running" | "in_progress" | "started" => JobStatus::Running,
            "succeeded" | "completed" | "complete" | "success" | "done" => JobStatus::Succeeded,
            "failed" | "error" | "cancelled" | "canceled" | "nsfw" => JobStatus::Failed,
            _ => return None,
        };
        Some(status)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl std::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown job status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::from_remote(s).ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
