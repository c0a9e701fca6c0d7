//! Clipshift Media Processing Library
//!
//! This crate provides the scratch-file workspace, the ffmpeg invoker and the
//! preview profiles used by the upload and post hooks.

pub mod preview;
pub mod scratch;
pub mod transcoder;

// Re-export commonly used types
pub use preview::{PreviewArtifact, PreviewProfile, Rendition};
pub use scratch::{NamePattern, ScratchFile, ScratchWorkspace};
pub use transcoder::{FfmpegTranscoder, TranscodeOperation, TranscodeOutcome, Transcoder};
