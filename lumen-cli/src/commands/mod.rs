//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod generate;
mod job;

pub use generate::GenerateCommands;
pub use job::JobCommands;

use anyhow::{Result, anyhow};
use clap::Subcommand;
use lumen_client::ClientError;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a generation and watch it until it finishes
    Generate {
        /// Only submit, print the job id and exit
        #[arg(long, global = true)]
        no_watch: bool,

        #[command(subcommand)]
        command: GenerateCommands,
    },
    /// Inspect and track existing jobs
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Generate { no_watch, command } => {
            generate::handle_generate_command(command, !no_watch, config).await
        }
        Commands::Job { command } => job::handle_job_command(command, config).await,
    }
}

/// Turns an API failure into a message that tells the user what to do
///
/// `what` names the object of the request, e.g. "job abc".
pub(crate) fn explain_api_error(err: ClientError, what: &str) -> anyhow::Error {
    if err.is_not_found() {
        anyhow!("{} not found", what)
    } else if err.is_server_error() {
        anyhow::Error::new(err).context("The generation service failed, try again later")
    } else if err.is_client_error() {
        anyhow::Error::new(err).context(format!("The service rejected the request for {}", what))
    } else {
        anyhow::Error::new(err).context(format!("Request for {} failed", what))
    }
}
