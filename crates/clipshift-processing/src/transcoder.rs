//! Transcoder invoker - runs ffmpeg with a fixed argument vector per operation.
//!
//! Parameters are constants on purpose: the same input and operation always
//! produce the same command line. A failed run is reported once and never
//! retried. No timeout is applied; a hung ffmpeg blocks its caller.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use clipshift_core::{ConfigError, PipelineError};
use tokio::process::Command;

/// Seek offset used when extracting a still frame.
pub const STILL_FRAME_OFFSET_SECS: &str = "1";
/// `-q:v` quality for still frames (2 = near best for mjpeg).
pub const STILL_FRAME_QUALITY: &str = "2";
pub const REMUX_VIDEO_CODEC: &str = "h264";
pub const REMUX_AUDIO_CODEC: &str = "mp2";
/// Sampling rate, width and palette pipeline for animated previews.
pub const ANIMATED_PREVIEW_FILTER: &str =
    "fps=6,scale=320:-1:flags=lanczos,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse";

const MAX_DIAGNOSTIC_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscodeOperation {
    /// Re-container into mp4 with h264 video.
    Remux,
    /// One frame at the fixed offset, as a still image.
    StillFrame,
    /// Looping, palette-optimized animated image.
    AnimatedPreview,
}

impl TranscodeOperation {
    pub fn label(self) -> &'static str {
        match self {
            TranscodeOperation::Remux => "remux",
            TranscodeOperation::StillFrame => "still_frame",
            TranscodeOperation::AnimatedPreview => "animated_preview",
        }
    }

    /// Verb phrase used in error messages ("failed to <action>: ...").
    pub fn action(self) -> &'static str {
        match self {
            TranscodeOperation::Remux => "run convert command",
            TranscodeOperation::StillFrame => "create still image",
            TranscodeOperation::AnimatedPreview => "create preview image",
        }
    }

    /// Extension of the file this operation produces.
    pub fn output_extension(self) -> &'static str {
        match self {
            TranscodeOperation::Remux => "mp4",
            TranscodeOperation::StillFrame => "jpg",
            TranscodeOperation::AnimatedPreview => "gif",
        }
    }
}

/// Exit outcome of one transcoder run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeOutcome {
    pub success: bool,
    /// Human-readable exit status, e.g. `exit status: 1`.
    pub status: String,
    /// Captured stdout followed by stderr.
    pub diagnostics: String,
}

impl TranscodeOutcome {
    pub fn succeeded(diagnostics: impl Into<String>) -> Self {
        Self {
            success: true,
            status: "exit status: 0".to_string(),
            diagnostics: diagnostics.into(),
        }
    }

    pub fn failed(status: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        Self {
            success: false,
            status: status.into(),
            diagnostics: diagnostics.into(),
        }
    }

    /// Status plus the tail of the diagnostics, for error messages.
    pub fn failure_detail(&self) -> String {
        let tail = diagnostic_tail(&self.diagnostics, MAX_DIAGNOSTIC_CHARS);
        if tail.is_empty() {
            self.status.clone()
        } else {
            format!("{}: {}", self.status, tail)
        }
    }
}

/// Keep the last `max_chars` characters; ffmpeg prints the actual error last.
pub fn diagnostic_tail(diagnostics: &str, max_chars: usize) -> String {
    let trimmed = diagnostics.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        return trimmed.to_string();
    }
    let skip = count - max_chars.saturating_sub(3);
    format!("...{}", trimmed.chars().skip(skip).collect::<String>())
}

/// Runs an external transcoder for one operation.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Run `operation` from `input` into `output`.
    ///
    /// `extra_args` go right before the output path. A process that could not
    /// be started is an error; a non-zero exit is an unsuccessful outcome.
    async fn run(
        &self,
        operation: TranscodeOperation,
        input: &Path,
        output: &Path,
        extra_args: &[String],
    ) -> Result<TranscodeOutcome, PipelineError>;

    /// Like [`Transcoder::run`], but an unsuccessful exit becomes an error.
    async fn run_checked(
        &self,
        operation: TranscodeOperation,
        input: &Path,
        output: &Path,
        extra_args: &[String],
    ) -> Result<TranscodeOutcome, PipelineError> {
        let outcome = self.run(operation, input, output, extra_args).await?;
        if outcome.success {
            Ok(outcome)
        } else {
            Err(PipelineError::process(
                operation.action(),
                outcome.failure_detail(),
            ))
        }
    }
}

/// Build the ffmpeg argument vector for `operation`.
pub fn build_args(
    operation: TranscodeOperation,
    input: &Path,
    output: &Path,
    extra_args: &[String],
) -> Vec<String> {
    let input = input.to_string_lossy().to_string();
    // Output scratch files exist before ffmpeg runs, so overwrite without asking
    let mut args = vec!["-y".to_string()];

    match operation {
        TranscodeOperation::Remux => {
            args.extend_from_slice(&[
                "-i".to_string(),
                input,
                "-vcodec".to_string(),
                REMUX_VIDEO_CODEC.to_string(),
                "-acodec".to_string(),
                REMUX_AUDIO_CODEC.to_string(),
            ]);
        }
        TranscodeOperation::StillFrame => {
            args.extend_from_slice(&[
                "-ss".to_string(),
                STILL_FRAME_OFFSET_SECS.to_string(),
                "-i".to_string(),
                input,
                "-frames:v".to_string(),
                "1".to_string(),
                "-q:v".to_string(),
                STILL_FRAME_QUALITY.to_string(),
            ]);
        }
        TranscodeOperation::AnimatedPreview => {
            args.extend_from_slice(&[
                "-i".to_string(),
                input,
                "-vf".to_string(),
                ANIMATED_PREVIEW_FILTER.to_string(),
                "-loop".to_string(),
                "0".to_string(),
            ]);
        }
    }

    args.extend(extra_args.iter().cloned());
    args.push(output.to_string_lossy().to_string());
    args
}

/// Validate that a program path doesn't contain shell metacharacters
fn validate_program_path(path: &str) -> Result<(), ConfigError> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.trim().is_empty() || path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(ConfigError::InvalidValue {
            key: "FFMPEG_PATH",
            expected: "a program path without shell metacharacters",
            value: path.to_string(),
        });
    }
    Ok(())
}

/// [`Transcoder`] backed by the ffmpeg command-line tool.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg_path: String,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: impl Into<String>) -> Result<Self, ConfigError> {
        let ffmpeg_path = ffmpeg_path.into();
        validate_program_path(&ffmpeg_path)?;
        Ok(Self { ffmpeg_path })
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.ffmpeg_path
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    #[tracing::instrument(skip(self, extra_args), fields(
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = operation.label()
    ))]
    async fn run(
        &self,
        operation: TranscodeOperation,
        input: &Path,
        output: &Path,
        extra_args: &[String],
    ) -> Result<TranscodeOutcome, PipelineError> {
        let args = build_args(operation, input, output, extra_args);
        tracing::debug!(command = %format!("{} {}", self.ffmpeg_path, args.join(" ")), "Running command");

        let start = Instant::now();
        let result = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                PipelineError::process(
                    operation.action(),
                    format!("failed to execute {}: {}", self.ffmpeg_path, e),
                )
            })?;

        let mut diagnostics = String::from_utf8_lossy(&result.stdout).into_owned();
        diagnostics.push_str(&String::from_utf8_lossy(&result.stderr));

        let elapsed = start.elapsed();
        if result.status.success() {
            tracing::info!(duration_ms = elapsed.as_millis(), "Transcode completed");
            Ok(TranscodeOutcome::succeeded(diagnostics))
        } else {
            tracing::warn!(
                duration_ms = elapsed.as_millis(),
                status = %result.status,
                "Transcode failed"
            );
            Ok(TranscodeOutcome::failed(result.status.to_string(), diagnostics))
        }
    }
}
