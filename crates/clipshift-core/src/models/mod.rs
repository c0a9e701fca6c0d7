//! Domain models exchanged with the hosting platform.

pub mod file;
pub mod post;

pub use file::FileDescriptor;
pub use post::Post;

/// Per-call context supplied by the platform with every hook invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookContext {
    pub request_id: String,
    pub session_id: String,
}

impl HookContext {
    pub fn new(request_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            session_id: session_id.into(),
        }
    }
}
