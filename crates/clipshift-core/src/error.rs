//! Error types module
//!
//! `PipelineError` covers every failure a conversion or preview run can hit.
//! Its `Display` output is the human-readable message handed back to the
//! platform, so variants render as `failed to <action>: <detail>`.
//!
//! Intentional no-ops (feature disabled, wrong extension, over the size limit)
//! are not errors and are modelled by the callers as skip reasons.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Scratch file create/write/read/close failures.
    #[error("failed to {action}: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: io::Error,
    },

    /// Transcoder could not be spawned or exited unsuccessfully.
    #[error("failed to {action}: {detail}")]
    Process { action: &'static str, detail: String },

    /// The platform's storage or messaging API rejected a call.
    #[error("failed to {action}: {detail}")]
    Storage { action: &'static str, detail: String },
}

impl PipelineError {
    pub fn io(action: &'static str, source: io::Error) -> Self {
        PipelineError::Io { action, source }
    }

    pub fn process(action: &'static str, detail: impl Into<String>) -> Self {
        PipelineError::Process {
            action,
            detail: detail.into(),
        }
    }

    pub fn storage(action: &'static str, detail: impl ToString) -> Self {
        PipelineError::Storage {
            action,
            detail: detail.to_string(),
        }
    }

    /// Machine-readable error code (e.g., "PROCESS_FAILURE")
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::Io { .. } => "IO_FAILURE",
            PipelineError::Process { .. } => "PROCESS_FAILURE",
            PipelineError::Storage { .. } => "STORAGE_FAILURE",
        }
    }
}

/// Errors raised while coercing platform settings into a `Configuration`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("plugin settings must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("invalid value for {key}: expected {expected}, got {value}")]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}
