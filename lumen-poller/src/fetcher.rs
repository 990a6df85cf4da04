//! Status fetch seam
//!
//! The poller only needs one remote operation: "what is the status of this
//! job now". It is trait-based so the poller can be driven by the HTTP
//! client in production and by scripted fakes in tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lumen_client::GenerationClient;
use lumen_core::dto::job::JobStatusReport;
use std::sync::Arc;

/// Fetches the normalized status of a job
///
/// Cancellation happens by dropping the returned future, which for the
/// HTTP implementation also aborts the underlying request.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    /// Fetches the current status of `job_id`
    ///
    /// Any error counts as one failed attempt.
    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusReport>;
}

#[async_trait]
impl StatusFetcher for GenerationClient {
    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusReport> {
        self.fetch_job_status(job_id)
            .await
            .with_context(|| format!("Failed to fetch status of job {}", job_id))
    }
}

#[async_trait]
impl<T: StatusFetcher + ?Sized> StatusFetcher for Arc<T> {
    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusReport> {
        (**self).fetch_status(job_id).await
    }
}
