//! Transcoder double with scripted outcomes

use async_trait::async_trait;
use clipshift_core::PipelineError;
use clipshift_processing::{TranscodeOperation, TranscodeOutcome, Transcoder};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub operation: TranscodeOperation,
    pub input_path: PathBuf,
    pub input: Vec<u8>,
}

/// Writes `<operation label>:<input bytes>` to the output path.
///
/// Inputs containing the failure marker exit non-zero with an ffmpeg-like
/// message; an unavailable transcoder fails to start at all.
#[derive(Default)]
pub struct ScriptedTranscoder {
    failure_marker: Option<Vec<u8>>,
    unavailable: bool,
    silent: bool,
    runs: Mutex<Vec<RecordedRun>>,
}

impl ScriptedTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on_input(mut self, marker: &[u8]) -> Self {
        self.failure_marker = Some(marker.to_vec());
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Exit successfully without writing any output.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn runs(&self) -> Vec<RecordedRun> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for ScriptedTranscoder {
    async fn run(
        &self,
        operation: TranscodeOperation,
        input: &Path,
        output: &Path,
        _extra_args: &[String],
    ) -> Result<TranscodeOutcome, PipelineError> {
        if self.unavailable {
            return Err(PipelineError::process(
                operation.action(),
                "failed to execute ffmpeg: No such file or directory (os error 2)",
            ));
        }

        let data = tokio::fs::read(input)
            .await
            .map_err(|e| PipelineError::io("read temp file", e))?;
        self.runs.lock().unwrap().push(RecordedRun {
            operation,
            input_path: input.to_path_buf(),
            input: data.clone(),
        });

        if let Some(marker) = &self.failure_marker {
            if data.windows(marker.len()).any(|w| w == marker.as_slice()) {
                return Ok(TranscodeOutcome::failed(
                    "exit status: 1",
                    "[mov,mp4,m4a,3gp,3g2,mj2 @ 0x0] moov atom not found\nInvalid data found when processing input",
                ));
            }
        }

        if self.silent {
            return Ok(TranscodeOutcome::succeeded(""));
        }

        let mut rendered = format!("{}:", operation.label()).into_bytes();
        rendered.extend_from_slice(&data);
        tokio::fs::write(output, rendered)
            .await
            .map_err(|e| PipelineError::io("write temp file", e))?;
        Ok(TranscodeOutcome::succeeded(""))
    }
}
