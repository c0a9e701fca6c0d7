//! Scratch files scoped to a single hook invocation.
//!
//! A [`ScratchFile`] owns its on-disk path from the moment the file is
//! created, before anything is written to it, and removes the file when it
//! is dropped. Every exit path of a hook (success, skip, error) therefore
//! leaves the workspace directory as it found it.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use clipshift_core::{PipelineError, ProcessingConfig};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

const RANDOM_LEN: usize = 8;
/// Cap on the name-derived parts of a scratch file name, in bytes. Upload
/// names can be close to the file-system limit on their own.
const MAX_PREFIX_BYTES: usize = 64;
const MAX_SUFFIX_BYTES: usize = 16;

/// `prefix*suffix` file name template; `*` is replaced by random characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    prefix: String,
    suffix: String,
}

impl NamePattern {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: truncate_at_boundary(sanitize_component(&prefix.into()), MAX_PREFIX_BYTES),
            suffix: truncate_at_boundary(sanitize_component(&suffix.into()), MAX_SUFFIX_BYTES),
        }
    }

    /// Parse a pattern such as `clip.mov.*.mov`. The last `*` marks where the
    /// random part goes; without one the random part is appended.
    pub fn parse(pattern: &str) -> Self {
        match pattern.rfind('*') {
            Some(idx) => Self::new(&pattern[..idx], &pattern[idx + 1..]),
            None => Self::new(pattern, ""),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

/// Path separators would let a file name escape the workspace directory.
fn sanitize_component(s: &str) -> String {
    s.chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect()
}

fn truncate_at_boundary(mut s: String, max_bytes: usize) -> String {
    if s.len() > max_bytes {
        let mut end = max_bytes;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}

/// Directory in which scratch files are created.
#[derive(Debug, Clone)]
pub struct ScratchWorkspace {
    dir: PathBuf,
}

impl Default for ScratchWorkspace {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl ScratchWorkspace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        match &config.scratch_dir {
            Some(dir) => Self::new(dir.clone()),
            None => Self::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create an empty, uniquely named file and take ownership of its removal.
    ///
    /// Used for output paths an external process will fill in.
    pub fn reserve(
        &self,
        pattern: &NamePattern,
        operation: &'static str,
    ) -> Result<ScratchFile, PipelineError> {
        let (_, path) = self.create(pattern, operation)?;
        Ok(path)
    }

    /// Create a uniquely named file holding `bytes`.
    ///
    /// Removal is registered before the write so a failed write still cleans
    /// up after itself.
    pub async fn stage(
        &self,
        pattern: &NamePattern,
        operation: &'static str,
        bytes: &[u8],
    ) -> Result<ScratchFile, PipelineError> {
        let (file, scratch) = self.create(pattern, operation)?;

        let mut file = tokio::fs::File::from_std(file);
        file.write_all(bytes)
            .await
            .map_err(|e| PipelineError::io("write temp file", e))?;
        file.sync_all()
            .await
            .map_err(|e| PipelineError::io("close temp file", e))?;
        drop(file);

        tracing::debug!(
            path = %scratch.path().display(),
            operation,
            bytes = bytes.len(),
            "Staged scratch file"
        );
        Ok(scratch)
    }

    fn create(
        &self,
        pattern: &NamePattern,
        operation: &'static str,
    ) -> Result<(std::fs::File, ScratchFile), PipelineError> {
        let named = tempfile::Builder::new()
            .prefix(pattern.prefix())
            .suffix(pattern.suffix())
            .rand_bytes(RANDOM_LEN)
            .tempfile_in(&self.dir)
            .map_err(|e| PipelineError::io("create temp file", e))?;
        let (file, path) = named.into_parts();
        Ok((file, ScratchFile::new(path, operation)))
    }
}

/// A file in the scratch workspace, removed on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: Option<TempPath>,
    operation: &'static str,
}

impl ScratchFile {
    fn new(path: TempPath, operation: &'static str) -> Self {
        Self {
            path: Some(path),
            operation,
        }
    }

    pub fn path(&self) -> &Path {
        match &self.path {
            Some(p) => &**p,
            None => Path::new(""),
        }
    }

    /// Label of the operation that created this file (for logs).
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Read back the whole file, e.g. after a transcoder wrote to it.
    pub async fn read(&self) -> io::Result<Bytes> {
        tokio::fs::read(self.path()).await.map(Bytes::from)
    }

    /// Read back a reserved output file. Reserved files exist before the
    /// transcoder runs, so an empty file means nothing was produced.
    pub async fn read_output(&self) -> io::Result<Bytes> {
        let bytes = self.read().await?;
        if bytes.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no output was produced",
            ));
        }
        Ok(bytes)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        let shown = path.display().to_string();
        match path.close() {
            Ok(()) => {
                tracing::debug!(path = %shown, operation = self.operation, "Removed scratch file");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %shown,
                    operation = self.operation,
                    error = %e,
                    "Failed to remove scratch file"
                );
            }
        }
    }
}
