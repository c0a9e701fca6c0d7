//! Clipshift Infrastructure Library
//!
//! Shared process-level setup for binaries embedding the hooks:
//! - Telemetry initialization (tracing subscriber)

#[cfg(feature = "observability-basic")]
pub mod telemetry;

// Re-export commonly used types
#[cfg(feature = "observability-basic")]
pub use telemetry::init_telemetry;
