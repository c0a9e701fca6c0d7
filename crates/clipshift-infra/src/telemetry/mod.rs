//! Telemetry initialization
//!
//! Installs the global `tracing` subscriber. Library crates only emit events;
//! the embedding process decides where they go.

mod init_basic;

pub use init_basic::{init_telemetry, DEFAULT_FILTER};
