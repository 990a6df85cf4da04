//! Lumen HTTP Client
//!
//! A small, type-safe HTTP client for the remote generation API.
//!
//! It submits generation requests and fetches job status, translating the
//! service's loose status vocabulary into [`lumen_core::domain::job::JobStatus`].
//!
//! # Example
//!
//! ```no_run
//! use lumen_client::GenerationClient;
//! use lumen_core::dto::generation::{GenerationParams, GenerationRequest, TextToImageParams};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = GenerationClient::new("http://localhost:8080");
//!
//!     let submitted = client
//!         .submit(&GenerationRequest::with_default_model(GenerationParams::TextToImage(
//!             TextToImageParams {
//!                 prompt: "a lighthouse at dusk".to_string(),
//!                 ..Default::default()
//!             },
//!         )))
//!         .await?;
//!
//!     let report = client.fetch_job_status(&submitted.job_id).await?;
//!     println!("{} is {}", submitted.job_id, report.status);
//!     Ok(())
//! }
//! ```

pub mod error;
mod generation;
mod jobs;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use jobs::normalize_job_set;
pub use lumen_core::dto::job::{JobStatusReport, SubmittedJob};

use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;

const API_KEY_HEADER: &str = "hf-api-key";
const API_SECRET_HEADER: &str = "hf-secret";

/// HTTP client for the remote generation API
#[derive(Debug, Clone)]
pub struct GenerationClient {
    /// Base URL of the generation API (e.g., "https://api.example.com")
    base_url: String,
    /// HTTP client instance
    client: Client,
    credentials: Option<Credentials>,
}

#[derive(Debug, Clone)]
struct Credentials {
    api_key: String,
    api_secret: String,
}

impl GenerationClient {
    /// Create a new generation client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the generation API
    ///
    /// # Example
    /// ```
    /// use lumen_client::GenerationClient;
    ///
    /// let client = GenerationClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new generation client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credentials: None,
        }
    }

    /// Attach API credentials sent with every request
    pub fn with_credentials(
        mut self,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        });
        self
    }

    /// Get the base URL of the generation API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of `segments` below the base URL, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidRequest(format!("invalid base URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidRequest("base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    /// Start a request with the common headers applied
    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let builder = self
            .client
            .request(method, self.endpoint(segments)?)
            .header(reqwest::header::ACCEPT, "application/json");

        Ok(match &self.credentials {
            Some(creds) => builder
                .header(API_KEY_HEADER, &creds.api_key)
                .header(API_SECRET_HEADER, &creds.api_secret),
            None => builder,
        })
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
