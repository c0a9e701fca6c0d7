//! Clipshift CLI: run the upload and post hooks against local files.
//!
//! Reads FFMPEG_PATH, CLIPSHIFT_SCRATCH_DIR, LOG_FORMAT and the CLIPSHIFT_*
//! feature settings from the environment (or a .env file).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use clipshift_cli::{mime_type_for, truncate_string, LocalHost};
use clipshift_core::{Configuration, FileDescriptor, HookContext, Post, ProcessingConfig};
use clipshift_plugin::{ClipshiftPlugin, EnrichmentOutcome, PluginApi, UploadDecision, UploadInterceptor};
use clipshift_processing::{FfmpegTranscoder, PreviewProfile, ScratchWorkspace};
use serde::Serialize;
use uuid::Uuid;

const CLI_CHANNEL: &str = "local";
const CLI_USER: &str = "clipshift-cli";

#[derive(Parser)]
#[command(name = "clipshift", about = "Convert QuickTime uploads and render video previews")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the upload hook on a file and write the converted copy
    Convert {
        /// Path to the uploaded file
        input: PathBuf,
        /// Where to write the replacement (default: input with .mp4)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Conversion size limit in bytes; 0 means no limit
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Post a video into a local store and run the post hook on it
    Preview {
        /// Path to the video to attach
        input: PathBuf,
        /// Directory holding stored files and posts
        #[arg(long)]
        store: PathBuf,
        /// Render a thumbnail/preview still pair instead of an animated GIF
        #[arg(long)]
        still: bool,
        /// Preview size limit in bytes; 0 means no limit
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ConvertReport {
    Converted {
        output: PathBuf,
        file: FileDescriptor,
    },
    Unchanged {
        reason: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn describe_input(input: &std::path::Path, size: usize) -> FileDescriptor {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    FileDescriptor {
        id: Uuid::new_v4().simple().to_string(),
        mime_type: mime_type_for(&extension).to_string(),
        size: size as i64,
        create_at: chrono::Utc::now().timestamp_millis(),
        name,
        extension,
        ..Default::default()
    }
}

async fn convert(
    processing: &ProcessingConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    limit: Option<i64>,
) -> anyhow::Result<()> {
    let mut config = Configuration::from_env();
    config.convert_mov_to_mp4 = true;
    if let Some(limit) = limit {
        config.conversion_file_size_limit = limit;
    }

    let transcoder =
        FfmpegTranscoder::new(processing.ffmpeg_path.clone()).context("Invalid FFMPEG_PATH")?;
    let workspace = ScratchWorkspace::from_config(processing);

    let data = tokio::fs::read(&input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let info = describe_input(&input, data.len());

    let mut source: &[u8] = &data;
    let mut converted = Vec::new();
    let decision = UploadInterceptor::new(&transcoder, &workspace)
        .intercept(&config, Some(&info), &mut source, &mut converted)
        .await;

    match decision {
        UploadDecision::Replace(file) => {
            let output = output.unwrap_or_else(|| input.with_extension("mp4"));
            tokio::fs::write(&output, &converted)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            print_json(&ConvertReport::Converted { output, file })
        }
        UploadDecision::PassThrough(reason) => print_json(&ConvertReport::Unchanged {
            reason: format!("{:?}", reason),
        }),
        UploadDecision::Reject(message) => {
            anyhow::bail!("Upload rejected: {}", truncate_string(&message, 500))
        }
    }
}

async fn preview(
    processing: &ProcessingConfig,
    input: PathBuf,
    store: PathBuf,
    still: bool,
    limit: Option<i64>,
) -> anyhow::Result<()> {
    let mut config = Configuration::from_env();
    config.create_preview_image = true;
    if let Some(limit) = limit {
        config.preview_file_size_limit = limit;
    }
    let profile = if still {
        PreviewProfile::StillFramePair
    } else {
        PreviewProfile::AnimatedGif
    };

    let host = Arc::new(
        LocalHost::open(&store)
            .await
            .with_context(|| format!("Failed to open store {}", store.display()))?,
    );
    let transcoder =
        FfmpegTranscoder::new(processing.ffmpeg_path.clone()).context("Invalid FFMPEG_PATH")?;

    let data = tokio::fs::read(&input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let name = describe_input(&input, data.len()).name;
    let attachment = host
        .upload_file(data, CLI_CHANNEL, &name)
        .await
        .context("Failed to store input")?;
    let post = host
        .create_post(Post {
            channel_id: CLI_CHANNEL.to_string(),
            user_id: CLI_USER.to_string(),
            message: format!("Uploaded {}", attachment.name),
            file_ids: vec![attachment.id.clone()],
            ..Default::default()
        })
        .await
        .context("Failed to create post")?;

    let plugin = ClipshiftPlugin::new(host.clone(), Arc::new(transcoder))
        .with_configuration(config)
        .with_workspace(ScratchWorkspace::from_config(processing))
        .with_preview_profile(profile);

    let ctx = HookContext::new(Uuid::new_v4().to_string(), CLI_USER);
    match plugin.enrich_post(&ctx, &post).await {
        EnrichmentOutcome::Posted(reply) => print_json(&reply),
        EnrichmentOutcome::NoArtifacts => {
            anyhow::bail!("No preview was created for {}", input.display())
        }
        EnrichmentOutcome::PostFailed(message) => anyhow::bail!(message),
        EnrichmentOutcome::Disabled => anyhow::bail!("Preview creation is disabled"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let processing = ProcessingConfig::from_env();
    clipshift_infra::init_telemetry(processing.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            limit,
        } => convert(&processing, input, output, limit).await,
        Commands::Preview {
            input,
            store,
            still,
            limit,
        } => preview(&processing, input, store, still, limit).await,
    }
}
