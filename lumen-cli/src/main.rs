//! Lumen CLI
//!
//! Command-line interface for submitting generations to the remote API and
//! tracking them until their results are ready.

mod commands;
mod config;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use lumen_poller::PollerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lumen")]
#[command(about = "Submit and track content generation jobs", long_about = None)]
struct Cli {
    /// Generation API URL
    #[arg(long, env = "LUMEN_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    /// API key
    #[arg(long, env = "LUMEN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// API secret
    #[arg(long, env = "LUMEN_API_SECRET", hide_env_values = true)]
    api_secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumen_cli=warn,lumen_poller=warn,lumen_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        api_url: cli.api_url,
        api_key: cli.api_key,
        api_secret: cli.api_secret,
        poller: PollerConfig::from_env().context("Invalid polling configuration")?,
    };
    config.validate()?;

    handle_command(cli.command, &config).await
}
