//! Test helpers for hook unit tests
//!
//! In-memory stand-ins for the platform API and the transcoder, so hooks can
//! be exercised without a running platform or an ffmpeg binary.

pub mod fixtures;
pub mod mock_api;
pub mod scripted_transcoder;

pub use fixtures::*;
pub use mock_api::MockPluginApi;
pub use scripted_transcoder::{RecordedRun, ScriptedTranscoder};
