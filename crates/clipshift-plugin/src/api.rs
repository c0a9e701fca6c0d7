//! Capabilities the hosting platform provides to the plugin.
//!
//! The platform implements this trait; the hooks only ever talk to the
//! platform through it. Logging is not part of the trait: hooks emit
//! `tracing` events and the embedding process routes them to the platform's
//! log sink.

use async_trait::async_trait;
use clipshift_core::{FileDescriptor, Post};
use thiserror::Error;

/// Errors reported by the platform's APIs
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Rejected(String),
}

/// Storage and messaging operations of the hosting platform
#[async_trait]
pub trait PluginApi: Send + Sync {
    /// Metadata of a committed file.
    async fn get_file_info(&self, file_id: &str) -> Result<FileDescriptor, ApiError>;

    /// Bytes of a committed file.
    async fn get_file(&self, file_id: &str) -> Result<Vec<u8>, ApiError>;

    /// Store a new file in `channel_id` and return its committed metadata.
    async fn upload_file(
        &self,
        data: Vec<u8>,
        channel_id: &str,
        name: &str,
    ) -> Result<FileDescriptor, ApiError>;

    /// Create a message and return it as stored.
    async fn create_post(&self, post: Post) -> Result<Post, ApiError>;
}
