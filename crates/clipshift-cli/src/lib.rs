//! Command-line harness for running the hooks against local files.

pub mod local_host;

pub use local_host::{mime_type_for, LocalHost};

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
