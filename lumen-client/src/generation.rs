//! Generation submission endpoints

use lumen_core::domain::job::JobStatus;
use lumen_core::dto::generation::{GenerationParams, GenerationRequest, SubmitBody};
use lumen_core::dto::job::{JobSetResponse, SubmittedJob};
use reqwest::Method;

use crate::GenerationClient;
use crate::error::{ClientError, Result};

impl GenerationClient {
    // =============================================================================
    // Submission
    // =============================================================================

    /// Submit a generation request
    ///
    /// Posts to `/v1/{kind}/{model}` and returns the identifier to track.
    /// A submission answered without a status is assumed to be pending.
    ///
    /// # Arguments
    /// * `request` - Model and parameters of the generation
    pub async fn submit(&self, request: &GenerationRequest) -> Result<SubmittedJob> {
        if request.model.trim().is_empty() {
            return Err(ClientError::InvalidRequest("model cannot be empty".into()));
        }
        if request.params.prompt().trim().is_empty() {
            return Err(ClientError::InvalidRequest("prompt cannot be empty".into()));
        }

        let builder = self.request(
            Method::POST,
            &["v1", request.kind().path_segment(), request.model.as_str()],
        )?;
        let builder = match &request.params {
            GenerationParams::TextToImage(p) => builder.json(&SubmitBody { params: p }),
            GenerationParams::TextToVideo(p) => builder.json(&SubmitBody { params: p }),
            GenerationParams::ImageToVideo(p) => builder.json(&SubmitBody { params: p }),
            GenerationParams::Speak(p) => builder.json(&SubmitBody { params: p }),
        };

        let response = builder.send().await?;
        let document: JobSetResponse = self.handle_response(response).await?;

        let job_id = document
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ClientError::ParseError("submission response carries no job id".into()))?;

        let status = match document.raw_status() {
            Some(raw) => JobStatus::from_remote(raw).ok_or_else(|| {
                ClientError::ParseError(format!("unrecognized job status '{}'", raw))
            })?,
            None => JobStatus::Pending,
        };

        tracing::info!(
            job_id = %job_id,
            kind = %request.kind(),
            model = %request.model,
            %status,
            "Generation submitted"
        );

        Ok(SubmittedJob {
            job_id,
            status,
            submitted_at: chrono::Utc::now(),
        })
    }
}
