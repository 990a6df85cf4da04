//! Polling session state machine
//!
//! A [`PollingSession`] holds the run-state of tracking one job and decides
//! what happens on each event:
//!
//! - `tick`: a scheduled poll is due; yields the sequence number of the
//!   fetch to issue, or ends the session when the attempt budget is spent
//! - `fetch_succeeded` / `fetch_failed`: a fetch settled
//! - `stop`: the caller gave up on the job
//!
//! Every event returns the [`Notification`]s to hand to the observer. The
//! session performs no I/O and never sleeps; the driver in
//! [`crate::poller`] owns scheduling.
//!
//! A settled fetch is applied only if its sequence number is the last one
//! issued and the session is still active. Anything else is a superseded or
//! post-stop response and is dropped without a trace.

use lumen_core::domain::job::{Job, JobStatus, ResultLocation};
use lumen_core::domain::progress::{estimate_progress, estimate_remaining_secs};
use lumen_core::dto::job::JobStatusReport;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::config::PollerConfig;
use crate::error::PollError;

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollOutcome {
    Succeeded,
    Failed,
    TimedOut,
    Abandoned,
    Stopped,
}

impl PollOutcome {
    /// Whether the job produced its results
    pub fn is_success(self) -> bool {
        self == PollOutcome::Succeeded
    }
}

impl std::fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollOutcome::Succeeded => write!(f, "succeeded"),
            PollOutcome::Failed => write!(f, "failed"),
            PollOutcome::TimedOut => write!(f, "timed out"),
            PollOutcome::Abandoned => write!(f, "abandoned"),
            PollOutcome::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Active,
    Complete(PollOutcome),
}

/// Event to deliver to the observer
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    StatusChanged(JobStatus),
    Completed(Job),
    Error(PollError),
}

/// What the driver should do for a due tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickDecision {
    /// Issue a fetch tagged with this sequence number
    Fetch { sequence: u64 },
    /// The session ended on this tick
    Finished(Vec<Notification>),
    /// The session is not active, nothing to do
    Skip,
}

/// Read-only copy of the caller-visible state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    pub result_locations: Vec<ResultLocation>,
    pub progress_percent: u8,
    pub estimated_seconds_remaining: u64,
    pub last_error: Option<PollError>,
    pub consecutive_error_count: u32,
    pub attempt_count: u32,
    pub current_interval: Duration,
    pub is_polling: bool,
    pub outcome: Option<PollOutcome>,
}

impl PollSnapshot {
    /// Job view of the snapshot
    pub fn job(&self) -> Job {
        Job {
            job_id: self.job_id.clone(),
            status: self.status,
            result_locations: self.result_locations.clone(),
        }
    }
}

/// Run-state of tracking one job
#[derive(Debug)]
pub struct PollingSession {
    config: PollerConfig,
    job: Job,
    state: SessionState,
    attempt_count: u32,
    consecutive_error_count: u32,
    current_interval: Duration,
    last_sequence: u64,
    started_at: Option<Instant>,
    progress_percent: u8,
    estimated_seconds_remaining: u64,
    last_error: Option<PollError>,
}

impl PollingSession {
    /// Creates an idle session that tracks nothing yet
    pub fn new(config: PollerConfig) -> Self {
        let current_interval = config.initial_interval;
        let estimated_seconds_remaining = config.estimated_total.as_secs();
        Self {
            config,
            job: Job::new(String::new(), JobStatus::Pending),
            state: SessionState::Idle,
            attempt_count: 0,
            consecutive_error_count: 0,
            current_interval,
            last_sequence: 0,
            started_at: None,
            progress_percent: 0,
            estimated_seconds_remaining,
            last_error: None,
        }
    }

    /// Starts tracking `job_id`, discarding all previous run-state
    ///
    /// A job that is already terminal completes the session on the spot.
    pub fn begin(&mut self, job_id: String, initial_status: JobStatus, now: Instant) -> SessionState {
        *self = Self::new(self.config.clone());
        self.job = Job::new(job_id, initial_status);
        self.started_at = Some(now);

        self.state = match initial_status {
            JobStatus::Succeeded => SessionState::Complete(PollOutcome::Succeeded),
            JobStatus::Failed => SessionState::Complete(PollOutcome::Failed),
            JobStatus::Pending | JobStatus::Running => SessionState::Active,
        };

        if initial_status.is_terminal() {
            self.mark_finished();
        }

        self.state
    }

    /// A scheduled poll is due
    pub fn tick(&mut self, now: Instant) -> TickDecision {
        if self.state != SessionState::Active {
            return TickDecision::Skip;
        }

        if self.attempt_count >= self.config.max_attempts {
            let error = PollError::Timeout {
                attempts: self.attempt_count,
            };
            self.last_error = Some(error.clone());
            self.state = SessionState::Complete(PollOutcome::TimedOut);
            return TickDecision::Finished(vec![Notification::Error(error)]);
        }

        self.attempt_count += 1;
        self.last_sequence += 1;

        let elapsed_secs = self.elapsed_secs(now);
        let estimated_total = self.config.estimated_total.as_secs();
        self.progress_percent = estimate_progress(elapsed_secs, self.attempt_count, estimated_total);
        self.estimated_seconds_remaining = estimate_remaining_secs(elapsed_secs, estimated_total);

        TickDecision::Fetch {
            sequence: self.last_sequence,
        }
    }

    /// The fetch tagged `sequence` returned a status
    pub fn fetch_succeeded(&mut self, sequence: u64, report: JobStatusReport) -> Vec<Notification> {
        if !self.accepts(sequence) {
            return Vec::new();
        }

        let mut notifications = Vec::new();
        let previous = self.job.status;

        self.job.status = report.status;
        self.job.result_locations = report.result_locations;
        self.consecutive_error_count = 0;
        self.current_interval = self.config.initial_interval;
        if matches!(self.last_error, Some(PollError::Transient { .. })) {
            self.last_error = None;
        }

        if report.status != previous {
            notifications.push(Notification::StatusChanged(report.status));
        }

        match report.status {
            JobStatus::Succeeded => {
                self.state = SessionState::Complete(PollOutcome::Succeeded);
                self.mark_finished();
                notifications.push(Notification::Completed(self.job.clone()));
            }
            JobStatus::Failed => {
                let error = PollError::JobFailed {
                    job_id: self.job.job_id.clone(),
                };
                self.state = SessionState::Complete(PollOutcome::Failed);
                self.mark_finished();
                self.last_error = Some(error.clone());
                notifications.push(Notification::Error(error));
            }
            JobStatus::Pending | JobStatus::Running => {}
        }

        notifications
    }

    /// The fetch tagged `sequence` failed
    pub fn fetch_failed(&mut self, sequence: u64, message: impl Into<String>) -> Vec<Notification> {
        if !self.accepts(sequence) {
            return Vec::new();
        }

        self.consecutive_error_count += 1;
        self.current_interval = self.config.next_interval(self.current_interval);

        let consecutive_errors = self.consecutive_error_count;
        let message = message.into();

        if consecutive_errors >= self.config.abandon_threshold {
            let error = PollError::Abandoned {
                consecutive_errors,
                message,
            };
            self.state = SessionState::Complete(PollOutcome::Abandoned);
            self.last_error = Some(error.clone());
            return vec![Notification::Error(error)];
        }

        if consecutive_errors >= self.config.error_report_threshold {
            let error = PollError::Transient {
                consecutive_errors,
                message,
            };
            self.last_error = Some(error.clone());
            return vec![Notification::Error(error)];
        }

        Vec::new()
    }

    /// Ends the session without an outcome of its own
    ///
    /// Returns `false` if the session had already ended.
    pub fn stop(&mut self) -> bool {
        match self.state {
            SessionState::Complete(_) => false,
            SessionState::Idle | SessionState::Active => {
                self.state = SessionState::Complete(PollOutcome::Stopped);
                true
            }
        }
    }

    /// Delay before the next tick, if the session is still active
    pub fn next_delay(&self) -> Option<Duration> {
        (self.state == SessionState::Active).then_some(self.current_interval)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn consecutive_error_count(&self) -> u32 {
        self.consecutive_error_count
    }

    pub fn snapshot(&self) -> PollSnapshot {
        PollSnapshot {
            job_id: self.job.job_id.clone(),
            status: self.job.status,
            result_locations: self.job.result_locations.clone(),
            progress_percent: self.progress_percent,
            estimated_seconds_remaining: self.estimated_seconds_remaining,
            last_error: self.last_error.clone(),
            consecutive_error_count: self.consecutive_error_count,
            attempt_count: self.attempt_count,
            current_interval: self.current_interval,
            is_polling: self.state == SessionState::Active,
            outcome: match self.state {
                SessionState::Complete(outcome) => Some(outcome),
                SessionState::Idle | SessionState::Active => None,
            },
        }
    }

    fn accepts(&self, sequence: u64) -> bool {
        self.state == SessionState::Active && sequence == self.last_sequence
    }

    fn mark_finished(&mut self) {
        self.progress_percent = 100;
        self.estimated_seconds_remaining = 0;
    }

    fn elapsed_secs(&self, now: Instant) -> u64 {
        self.started_at
            .map(|started| now.saturating_duration_since(started).as_secs())
            .unwrap_or(0)
    }
}
