//! Job command handlers
//!
//! Handles one-shot status lookups and live tracking of a job with the
//! poller.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use lumen_client::GenerationClient;
use lumen_core::domain::job::JobStatus;
use lumen_poller::{JobPoller, PollOutcome};
use tracing::debug;

use super::explain_api_error;
use crate::config::Config;
use crate::render::{ConsoleObserver, colorize_status, print_results, progress_line};

/// How often the progress line is redrawn
const REDRAW_INTERVAL: Duration = Duration::from_millis(500);

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Fetch the current status of a job once
    Status {
        /// Job id returned at submission
        id: String,

        /// Print the raw remote document as JSON
        #[arg(long)]
        raw: bool,
    },
    /// Track a job until it finishes
    Watch {
        /// Job id returned at submission
        id: String,

        /// Status known at submission time
        #[arg(long, default_value = "pending", value_parser = parse_status)]
        initial_status: JobStatus,
    },
}

/// Handle job commands
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = Arc::new(config.client());

    match command {
        JobCommands::Status { id, raw } => show_status(&client, &id, raw).await,
        JobCommands::Watch { id, initial_status } => {
            watch_job(client, config, &id, initial_status).await
        }
    }
}

fn parse_status(raw: &str) -> Result<JobStatus, String> {
    raw.parse::<JobStatus>().map_err(|e| e.to_string())
}

/// Fetch and display a job once
async fn show_status(client: &GenerationClient, id: &str, raw: bool) -> Result<()> {
    let what = format!("job {}", id);

    if raw {
        let document = client
            .get_job_set(id)
            .await
            .map_err(|e| explain_api_error(e, &what))?;
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    let report = client
        .fetch_job_status(id)
        .await
        .map_err(|e| explain_api_error(e, &what))?;

    println!("{}", "Job Details:".bold());
    println!("  ID:      {}", id.cyan());
    println!("  Status:  {}", colorize_status(report.status));
    if report.status == JobStatus::Succeeded {
        println!("\n{}", "Results:".bold());
        print_results(&report.result_locations);
    }

    Ok(())
}

/// Track a job with the poller, redrawing progress until it ends
///
/// Ctrl-C stops tracking; the job itself keeps running remotely.
pub async fn watch_job(
    client: Arc<GenerationClient>,
    config: &Config,
    job_id: &str,
    initial_status: JobStatus,
) -> Result<()> {
    let abandon_threshold = config.poller.abandon_threshold;
    let poller = JobPoller::new(client, config.poller.clone());

    println!("{} {}", "Tracking job".bold(), job_id.cyan());
    poller.start(job_id, initial_status, ConsoleObserver::new(abandon_threshold))?;

    let mut redraw = tokio::time::interval(REDRAW_INTERVAL);
    let wait = poller.wait();
    tokio::pin!(wait);

    let outcome = loop {
        tokio::select! {
            outcome = &mut wait => break outcome,
            _ = redraw.tick() => {
                let snapshot = poller.snapshot();
                if snapshot.is_polling {
                    print!("\r{}", progress_line(&snapshot, abandon_threshold));
                    let _ = std::io::stdout().flush();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!(job_id, "Interrupted, stopping poller");
                poller.stop();
            }
        }
    };

    let snapshot = poller.snapshot();
    print!("\r\x1b[2K");
    match outcome {
        Some(PollOutcome::Succeeded) | None => {
            println!("{} Job {} finished", "✓".green(), job_id.cyan());
            Ok(())
        }
        Some(PollOutcome::Stopped) => {
            println!(
                "{} Stopped tracking job {}; it may still be running remotely",
                "■".dimmed(),
                job_id.cyan()
            );
            Ok(())
        }
        Some(outcome) => {
            let reason = snapshot
                .last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| outcome.to_string());
            anyhow::bail!("Job {} did not complete: {}", job_id, reason)
        }
    }
}
