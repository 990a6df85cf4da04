//! Job DTOs
//!
//! The remote service groups the jobs spawned by one generation request
//! into a "job set". Status and result URLs may appear on the set itself or
//! on its member jobs, under a few different nested paths.

use serde::{Deserialize, Serialize};

use crate::domain::job::{JobStatus, ResultLocation};

/// Job set document as returned by the remote service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobSetResponse {
    #[serde(default, alias = "job_set_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub result_url: Option<String>,
    #[serde(default)]
    pub jobs: Vec<RemoteJob>,
}

/// One member job of a job set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteJob {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Rendition set (`raw` full quality, `min` preview)
    #[serde(default)]
    pub results: Option<RemoteResults>,
    /// Single result, used by older endpoints
    #[serde(default)]
    pub result: Option<MediaRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteResults {
    #[serde(default)]
    pub raw: Option<MediaRef>,
    #[serde(default)]
    pub min: Option<MediaRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaRef {
    #[serde(default)]
    pub url: Option<String>,
}

impl MediaRef {
    fn url(media: &Option<MediaRef>) -> Option<&str> {
        media
            .as_ref()
            .and_then(|m| m.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

impl JobSetResponse {
    /// Raw status word that should drive the tracked job
    ///
    /// The first member job is authoritative when present, the set-level
    /// status is the fallback.
    pub fn raw_status(&self) -> Option<&str> {
        self.jobs
            .first()
            .and_then(|job| job.status.as_deref())
            .or(self.status.as_deref())
    }

    /// Every distinct result URL in the document, in document order
    ///
    /// Per member job the full-quality rendition wins over the preview,
    /// which wins over the legacy single result.
    pub fn result_locations(&self) -> Vec<ResultLocation> {
        let member_urls = self.jobs.iter().filter_map(|job| {
            let results = job.results.as_ref();
            results
                .and_then(|r| MediaRef::url(&r.raw))
                .or_else(|| results.and_then(|r| MediaRef::url(&r.min)))
                .or_else(|| MediaRef::url(&job.result))
        });
        let set_url = self.result_url.as_deref().filter(|url| !url.is_empty());

        let mut locations: Vec<ResultLocation> = Vec::new();
        for url in member_urls.chain(set_url) {
            if !locations.iter().any(|loc| loc.url == url) {
                locations.push(ResultLocation::new(url));
            }
        }
        locations
    }
}

/// Normalized outcome of one status fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusReport {
    pub status: JobStatus,
    pub result_locations: Vec<ResultLocation>,
}

impl JobStatusReport {
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            result_locations: Vec::new(),
        }
    }

    pub fn with_result(mut self, url: impl Into<String>) -> Self {
        self.result_locations.push(ResultLocation::new(url));
        self
    }
}

/// Job identifier and status handed back right after submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedJob {
    pub job_id: String,
    pub status: JobStatus,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> JobSetResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_member_status_wins_over_set_status() {
        let doc = parse(r#"{"id":"set-1","status":"queued","jobs":[{"status":"completed"}]}"#);
        assert_eq!(doc.raw_status(), Some("completed"));
    }

    #[test]
    fn test_set_status_used_without_members() {
        let doc = parse(r#"{"job_set_id":"set-1","status":"processing"}"#);
        assert_eq!(doc.id.as_deref(), Some("set-1"));
        assert_eq!(doc.raw_status(), Some("processing"));
    }

    #[test]
    fn test_result_locations_prefer_raw_rendition() {
        let doc = parse(
            r#"{
                "jobs": [
                    {"status":"completed","results":{"raw":{"url":"https://x/a.png"},"min":{"url":"https://x/a_min.png"}}},
                    {"status":"completed","results":{"min":{"url":"https://x/b_min.png"}}},
                    {"status":"completed","result":{"url":"https://x/c.mp4"}}
                ],
                "result_url": "https://x/a.png"
            }"#,
        );

        let urls: Vec<_> = doc.result_locations().into_iter().map(|l| l.url).collect();
        assert_eq!(
            urls,
            vec!["https://x/a.png", "https://x/b_min.png", "https://x/c.mp4"]
        );
    }

    #[test]
    fn test_empty_document_has_no_status() {
        let doc = parse("{}");
        assert_eq!(doc.raw_status(), None);
        assert!(doc.result_locations().is_empty());
    }
}
