//! Job status endpoints

use lumen_core::domain::job::JobStatus;
use lumen_core::dto::job::{JobSetResponse, JobStatusReport};
use reqwest::Method;

use crate::GenerationClient;
use crate::error::{ClientError, Result};

impl GenerationClient {
    // =============================================================================
    // Job Status
    // =============================================================================

    /// Get the raw job set document
    ///
    /// # Arguments
    /// * `job_id` - Identifier returned at submission time
    pub async fn get_job_set(&self, job_id: &str) -> Result<JobSetResponse> {
        if job_id.is_empty() {
            return Err(ClientError::InvalidRequest("job id cannot be empty".into()));
        }

        let response = self
            .request(Method::GET, &["v1", "job-sets", job_id])?
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Fetch the current status of a job, normalized
    ///
    /// Result locations are only reported once the job succeeded.
    ///
    /// # Errors
    /// Besides transport and HTTP errors, a document without a recognizable
    /// status is reported as [`ClientError::ParseError`].
    pub async fn fetch_job_status(&self, job_id: &str) -> Result<JobStatusReport> {
        let document = self.get_job_set(job_id).await?;
        let report = normalize_job_set(&document)?;

        tracing::debug!(job_id, status = %report.status, results = report.result_locations.len(), "Fetched job status");

        Ok(report)
    }
}

/// Translate a remote job set into a normalized status report
pub fn normalize_job_set(document: &JobSetResponse) -> Result<JobStatusReport> {
    let raw = document
        .raw_status()
        .ok_or_else(|| ClientError::ParseError("response carries no job status".into()))?;

    let status = JobStatus::from_remote(raw)
        .ok_or_else(|| ClientError::ParseError(format!("unrecognized job status '{}'", raw)))?;

    let result_locations = if status == JobStatus::Succeeded {
        document.result_locations()
    } else {
        Vec::new()
    };

    Ok(JobStatusReport {
        status,
        result_locations,
    })
}
