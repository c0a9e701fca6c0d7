//! Preview profiles - which derived images are rendered for a video attachment.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use bytes::Bytes;
use clipshift_core::PipelineError;

use crate::scratch::{NamePattern, ScratchFile, ScratchWorkspace};
use crate::transcoder::{TranscodeOperation, Transcoder};

/// How preview media is derived from a video.
///
/// `AnimatedGif` is the supported profile. `StillFramePair` renders the
/// thumbnail/preview still pair an earlier release produced and is kept
/// selectable for hosts that cannot display animated images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PreviewProfile {
    #[default]
    AnimatedGif,
    StillFramePair,
}

/// One rendition of a profile: the operation and the uploaded file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rendition {
    pub operation: TranscodeOperation,
    pub upload_name: &'static str,
}

const ANIMATED_GIF: &[Rendition] = &[Rendition {
    operation: TranscodeOperation::AnimatedPreview,
    upload_name: "preview.gif",
}];

const STILL_FRAME_PAIR: &[Rendition] = &[
    Rendition {
        operation: TranscodeOperation::StillFrame,
        upload_name: "thumbnail.jpg",
    },
    Rendition {
        operation: TranscodeOperation::StillFrame,
        upload_name: "preview.jpg",
    },
];

/// A rendered derived image, ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewArtifact {
    pub name: &'static str,
    pub operation: TranscodeOperation,
    pub bytes: Bytes,
}

impl PreviewProfile {
    pub fn renditions(self) -> &'static [Rendition] {
        match self {
            PreviewProfile::AnimatedGif => ANIMATED_GIF,
            PreviewProfile::StillFramePair => STILL_FRAME_PAIR,
        }
    }

    /// Render every artifact of this profile from the staged `source`.
    ///
    /// All renditions complete before anything is returned, so a failure
    /// part-way through never leaves a half-uploaded set behind. Output
    /// scratch files are removed before this returns.
    pub async fn render(
        self,
        transcoder: &dyn Transcoder,
        workspace: &ScratchWorkspace,
        source: &ScratchFile,
    ) -> Result<Vec<PreviewArtifact>, PipelineError> {
        let source_name = source
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("source");

        let mut artifacts = Vec::with_capacity(self.renditions().len());
        for rendition in self.renditions() {
            let stem = rendition
                .upload_name
                .split('.')
                .next()
                .unwrap_or("preview");
            let pattern = NamePattern::new(
                format!("{}_{}.", source_name, stem),
                format!(".{}", rendition.operation.output_extension()),
            );
            let output = workspace.reserve(&pattern, rendition.operation.label())?;

            transcoder
                .run_checked(rendition.operation, source.path(), output.path(), &[])
                .await?;

            let bytes = output
                .read_output()
                .await
                .map_err(|e| PipelineError::io("read preview image", e))?;

            artifacts.push(PreviewArtifact {
                name: rendition.upload_name,
                operation: rendition.operation,
                bytes,
            });
        }
        Ok(artifacts)
    }
}

impl Display for PreviewProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PreviewProfile::AnimatedGif => write!(f, "animated_gif"),
            PreviewProfile::StillFramePair => write!(f, "still_frame_pair"),
        }
    }
}

impl FromStr for PreviewProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "animated_gif" | "animated" | "gif" => Ok(PreviewProfile::AnimatedGif),
            "still_frame_pair" | "still" | "jpg" => Ok(PreviewProfile::StillFramePair),
            other => Err(format!("unknown preview profile: {}", other)),
        }
    }
}
