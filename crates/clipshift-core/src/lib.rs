//! Clipshift Core Library
//!
//! This crate provides the domain models, error types and configuration shared
//! by the processing and plugin crates.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{ConfigGate, Configuration, LogFormat, ProcessingConfig};
pub use error::{ConfigError, PipelineError};
pub use models::{FileDescriptor, HookContext, Post};
