//! Configuration module
//!
//! Handles CLI configuration: where the generation API lives, the
//! credentials to send, and the polling schedule used to watch jobs.

use lumen_client::GenerationClient;
use lumen_poller::PollerConfig;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the generation API
    pub api_url: String,

    /// API key, sent along with `api_secret`
    pub api_key: Option<String>,

    /// API secret
    pub api_secret: Option<String>,

    /// Polling schedule for `watch`
    pub poller: PollerConfig,
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("api_url must start with http:// or https://");
        }

        if self.api_key.is_some() != self.api_secret.is_some() {
            anyhow::bail!("api_key and api_secret must be provided together");
        }

        self.poller.validate()
    }

    /// Builds the HTTP client for this configuration
    pub fn client(&self) -> GenerationClient {
        let client = GenerationClient::new(self.api_url.clone());
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) => client.with_credentials(key.clone(), secret.clone()),
            _ => client,
        }
    }
}
