//! Generate command handlers
//!
//! Builds a generation request from the command line, submits it and
//! optionally hands the returned job to the watcher.

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::*;
use lumen_core::dto::generation::{
    GenerationParams, GenerationRequest, ImageToVideoParams, InputImage, SpeakParams,
    TextToImageParams, TextToVideoParams,
};

use super::explain_api_error;
use super::job::watch_job;
use crate::config::Config;

/// Generate subcommands, one per generation kind
#[derive(Subcommand)]
pub enum GenerateCommands {
    /// Text to image
    #[command(name = "text2image")]
    TextToImage {
        #[command(flatten)]
        common: CommonArgs,

        /// Output size, e.g. "1024x1024"
        #[arg(long)]
        size: Option<String>,

        /// Quality preset
        #[arg(long)]
        quality: Option<String>,

        /// Number of images
        #[arg(long)]
        batch_size: Option<u32>,

        /// What the image should not contain
        #[arg(long)]
        negative_prompt: Option<String>,
    },
    /// Text to video
    #[command(name = "text2video")]
    TextToVideo {
        #[command(flatten)]
        common: CommonArgs,

        /// Duration in seconds
        #[arg(long)]
        duration: Option<u32>,

        /// Resolution, e.g. "720p"
        #[arg(long)]
        resolution: Option<String>,

        /// Keep the camera fixed
        #[arg(long)]
        camera_fixed: bool,
    },
    /// Image to video
    #[command(name = "image2video")]
    ImageToVideo {
        #[command(flatten)]
        common: CommonArgs,

        /// URL of a source image (repeatable)
        #[arg(long = "image-url", required = true)]
        image_urls: Vec<String>,

        /// Camera motion preset
        #[arg(long)]
        camera_control: Option<String>,

        /// Duration in seconds
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Talking video from a script
    Speak {
        #[command(flatten)]
        common: CommonArgs,

        /// Quality preset
        #[arg(long)]
        quality: Option<String>,
    },
}

/// Arguments shared by every generation kind
#[derive(Args)]
pub struct CommonArgs {
    /// Prompt describing the content
    #[arg(short, long)]
    prompt: String,

    /// Model to use (defaults per kind)
    #[arg(short, long)]
    model: Option<String>,

    /// Aspect ratio, e.g. "16:9"
    #[arg(long)]
    aspect_ratio: Option<String>,

    /// Let the service rewrite the prompt
    #[arg(long)]
    enhance_prompt: bool,
}

/// Handle generate commands
pub async fn handle_generate_command(
    command: GenerateCommands,
    watch: bool,
    config: &Config,
) -> Result<()> {
    let request = build_request(command);
    let client = Arc::new(config.client());

    println!(
        "{} {} with {}",
        "Submitting".bold(),
        request.kind().to_string().cyan(),
        request.model.dimmed()
    );

    let submitted = client
        .submit(&request)
        .await
        .map_err(|e| explain_api_error(e, "generation"))?;

    println!(
        "{} Job {} ({})",
        "✓".green(),
        submitted.job_id.cyan(),
        submitted.status
    );

    if !watch {
        return Ok(());
    }

    println!();
    watch_job(client, config, &submitted.job_id, submitted.status).await
}

fn build_request(command: GenerateCommands) -> GenerationRequest {
    let (model, params) = match command {
        GenerateCommands::TextToImage {
            common,
            size,
            quality,
            batch_size,
            negative_prompt,
        } => (
            common.model,
            GenerationParams::TextToImage(TextToImageParams {
                prompt: common.prompt,
                width_and_height: size,
                aspect_ratio: common.aspect_ratio,
                quality,
                batch_size,
                negative_prompt,
                enhance_prompt: common.enhance_prompt,
            }),
        ),
        GenerateCommands::TextToVideo {
            common,
            duration,
            resolution,
            camera_fixed,
        } => (
            common.model,
            GenerationParams::TextToVideo(TextToVideoParams {
                prompt: common.prompt,
                duration,
                resolution,
                aspect_ratio: common.aspect_ratio,
                camera_fixed,
            }),
        ),
        GenerateCommands::ImageToVideo {
            common,
            image_urls,
            camera_control,
            duration,
        } => (
            common.model,
            GenerationParams::ImageToVideo(ImageToVideoParams {
                prompt: common.prompt,
                input_images: image_urls.into_iter().map(InputImage::url).collect(),
                aspect_ratio: common.aspect_ratio,
                camera_control,
                duration_sec: duration,
                enhance_prompt: common.enhance_prompt,
            }),
        ),
        GenerateCommands::Speak { common, quality } => (
            common.model,
            GenerationParams::Speak(SpeakParams {
                prompt: common.prompt,
                quality,
                aspect_ratio: common.aspect_ratio,
                enhance_prompt: common.enhance_prompt,
            }),
        ),
    };

    match model {
        Some(model) => GenerationRequest { model, params },
        None => GenerationRequest::with_default_model(params),
    }
}
