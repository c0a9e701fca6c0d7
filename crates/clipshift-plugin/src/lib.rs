//! Clipshift Plugin
//!
//! This crate wires the conversion pipeline into the two hooks a messaging
//! platform exposes to plugins:
//!
//! - `file_will_be_uploaded` (pre-commit): may replace a `.mov` upload with an
//!   `.mp4` remux before the platform stores it.
//! - `message_has_been_posted` (post-commit): renders preview media for video
//!   attachments and posts them as a threaded reply.
//!
//! The platform itself is reached only through the [`PluginApi`] trait.

pub mod api;
pub mod enrich;
pub mod plugin;
pub mod upload;

// Re-export commonly used types
pub use api::{ApiError, PluginApi};
pub use enrich::{EnrichmentOutcome, PreviewPipeline, PREVIEW_EXTENSIONS};
pub use plugin::ClipshiftPlugin;
pub use upload::{SkipReason, UploadDecision, UploadInterceptor};

// Test helpers (only available in test mode)
#[cfg(test)]
pub mod test_helpers;
