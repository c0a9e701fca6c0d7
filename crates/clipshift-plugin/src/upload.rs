//! Pre-commit upload interception: remux `.mov` uploads into `.mp4`.

use clipshift_core::{Configuration, FileDescriptor, PipelineError};
use clipshift_processing::{NamePattern, ScratchWorkspace, TranscodeOperation, Transcoder};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// The only container converted on upload.
pub const LEGACY_EXTENSION: &str = "mov";
pub const CONVERTED_EXTENSION: &str = "mp4";
pub const CONVERTED_MIME_TYPE: &str = "video/mp4";

/// Why an upload was left untouched. Skips are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingDescriptor,
    Disabled,
    UnsupportedExtension,
    OverSizeLimit,
}

/// Result of running the upload policy on one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadDecision {
    /// Keep the original bytes and metadata; nothing was written.
    PassThrough(SkipReason),
    /// Commit these metadata together with the bytes written to the destination.
    Replace(FileDescriptor),
    /// Refuse the upload and show this message to the uploader.
    Reject(String),
}

impl UploadDecision {
    /// The `(descriptor, error)` pair the platform expects from the hook.
    pub fn into_host_reply(self) -> (Option<FileDescriptor>, String) {
        match self {
            UploadDecision::PassThrough(_) => (None, String::new()),
            UploadDecision::Replace(info) => (Some(info), String::new()),
            UploadDecision::Reject(message) => (None, message),
        }
    }
}

/// Decide whether `info` should be converted under `config`.
pub fn check_eligibility<'a>(
    config: &Configuration,
    info: Option<&'a FileDescriptor>,
) -> Result<&'a FileDescriptor, SkipReason> {
    let info = info.ok_or(SkipReason::MissingDescriptor)?;
    if !config.convert_mov_to_mp4 {
        return Err(SkipReason::Disabled);
    }
    if info.normalized_extension() != LEGACY_EXTENSION {
        return Err(SkipReason::UnsupportedExtension);
    }
    if config.exceeds_conversion_limit(info.size) {
        return Err(SkipReason::OverSizeLimit);
    }
    Ok(info)
}

/// Runs the upload policy against one scratch workspace and transcoder.
pub struct UploadInterceptor<'a> {
    transcoder: &'a dyn Transcoder,
    workspace: &'a ScratchWorkspace,
}

impl<'a> UploadInterceptor<'a> {
    pub fn new(transcoder: &'a dyn Transcoder, workspace: &'a ScratchWorkspace) -> Self {
        Self {
            transcoder,
            workspace,
        }
    }

    /// Apply the policy. `destination` is written only when the decision is
    /// `Replace`; any failure rejects the upload.
    pub async fn intercept<R, W>(
        &self,
        config: &Configuration,
        info: Option<&FileDescriptor>,
        source: &mut R,
        destination: &mut W,
    ) -> UploadDecision
    where
        R: AsyncRead + Unpin + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
    {
        let info = match check_eligibility(config, info) {
            Ok(info) => info,
            Err(reason) => {
                tracing::debug!(?reason, "Upload left unchanged");
                return UploadDecision::PassThrough(reason);
            }
        };

        tracing::debug!(name = %info.name, size = info.size, "Converting upload");

        match self.convert(info, source, destination).await {
            Ok(converted) => {
                tracing::debug!(
                    name = %converted.name,
                    size = converted.size,
                    "Created converted file info"
                );
                UploadDecision::Replace(converted)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(
                    error_code = e.error_code(),
                    name = %info.name,
                    "{}",
                    message
                );
                UploadDecision::Reject(message)
            }
        }
    }

    async fn convert<R, W>(
        &self,
        info: &FileDescriptor,
        source: &mut R,
        destination: &mut W,
    ) -> Result<FileDescriptor, PipelineError>
    where
        R: AsyncRead + Unpin + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut data = Vec::new();
        source
            .read_to_end(&mut data)
            .await
            .map_err(|e| PipelineError::io("read video", e))?;

        let prefix = format!("{}.", info.base_name());
        let operation = TranscodeOperation::Remux;

        let input = self
            .workspace
            .stage(
                &NamePattern::new(prefix.clone(), format!(".{}", LEGACY_EXTENSION)),
                operation.label(),
                &data,
            )
            .await?;
        drop(data);

        let output = self.workspace.reserve(
            &NamePattern::new(prefix, format!(".{}", CONVERTED_EXTENSION)),
            operation.label(),
        )?;

        self.transcoder
            .run_checked(operation, input.path(), output.path(), &[])
            .await?;

        let converted = output
            .read_output()
            .await
            .map_err(|e| PipelineError::io("read converted video", e))?;

        destination
            .write_all(&converted)
            .await
            .map_err(|e| PipelineError::io("write new video", e))?;
        destination
            .flush()
            .await
            .map_err(|e| PipelineError::io("write new video", e))?;

        Ok(info.converted(
            CONVERTED_EXTENSION,
            CONVERTED_MIME_TYPE,
            converted.len() as i64,
        ))
    }
}
