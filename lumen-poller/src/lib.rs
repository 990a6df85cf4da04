//! Lumen Job Poller
//!
//! Tracks a submitted generation job until the remote service reports a
//! terminal status, keeping a caller-visible snapshot of status, results,
//! estimated progress and error state up to date.
//!
//! Architecture:
//! - Session: pure state machine deciding what each tick and fetch result means
//! - Poller: Tokio task driving the session on a schedule, with cancellation
//! - Fetcher: trait seam to the remote status operation
//! - Observer: lifecycle callbacks (status change, error, completion)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lumen_client::GenerationClient;
//! use lumen_core::domain::job::JobStatus;
//! use lumen_poller::{Callbacks, JobPoller, PollerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Arc::new(GenerationClient::new("http://localhost:8080"));
//!     let poller = JobPoller::new(client, PollerConfig::default());
//!
//!     poller.start(
//!         "job-set-id",
//!         JobStatus::Pending,
//!         Callbacks::new().with_complete(|job| println!("{:?}", job.result_locations)),
//!     )?;
//!
//!     let outcome = poller.wait().await;
//!     println!("finished: {:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod observer;
pub mod poller;
pub mod session;

pub use clock::{Clock, ManualClock, TokioClock};
pub use config::PollerConfig;
pub use error::{PollError, PollErrorKind, PollerError};
pub use fetcher::StatusFetcher;
pub use observer::{Callbacks, JobObserver};
pub use poller::JobPoller;
pub use session::{PollOutcome, PollSnapshot, PollingSession, SessionState};
