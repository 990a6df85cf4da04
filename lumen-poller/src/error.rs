//! Error types for the job poller

use serde::Serialize;
use thiserror::Error;

/// Errors reported to the observer while tracking a job
///
/// Only [`PollError::Transient`] leaves the session running; every other
/// variant is the final outcome of the session.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PollError {
    /// Repeated fetch failures, polling continues
    #[error("experiencing network issues (retry {consecutive_errors}): {message}")]
    Transient {
        consecutive_errors: u32,
        message: String,
    },

    /// The remote service reported the job as failed
    #[error("job {job_id} generation failed")]
    JobFailed { job_id: String },

    /// The attempt budget ran out before the job finished
    #[error("max polling attempts reached after {attempts} attempts, job may be stuck")]
    Timeout { attempts: u32 },

    /// Too many consecutive fetch failures
    #[error("polling abandoned after {consecutive_errors} consecutive errors: {message}")]
    Abandoned {
        consecutive_errors: u32,
        message: String,
    },
}

/// Discriminant of [`PollError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollErrorKind {
    Transient,
    JobFailed,
    Timeout,
    Abandoned,
}

impl std::fmt::Display for PollErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollErrorKind::Transient => write!(f, "transient"),
            PollErrorKind::JobFailed => write!(f, "job_failed"),
            PollErrorKind::Timeout => write!(f, "timeout"),
            PollErrorKind::Abandoned => write!(f, "abandoned"),
        }
    }
}

impl PollError {
    pub fn kind(&self) -> PollErrorKind {
        match self {
            PollError::Transient { .. } => PollErrorKind::Transient,
            PollError::JobFailed { .. } => PollErrorKind::JobFailed,
            PollError::Timeout { .. } => PollErrorKind::Timeout,
            PollError::Abandoned { .. } => PollErrorKind::Abandoned,
        }
    }

    /// Whether this error ended the session
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollError::Transient { .. })
    }
}

/// Errors returned by [`crate::JobPoller`] control operations
#[derive(Debug, Error)]
pub enum PollerError {
    #[error("job id cannot be empty")]
    EmptyJobId,

    #[error("job poller must be started from within a Tokio runtime")]
    NoRuntime,

    #[error("invalid polling configuration: {0}")]
    InvalidConfig(String),
}
