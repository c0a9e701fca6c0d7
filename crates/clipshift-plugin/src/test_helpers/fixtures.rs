//! Descriptor and I/O fixtures

use clipshift_core::{FileDescriptor, Post};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// A committed video attachment of `size` bytes.
pub fn video_attachment(id: &str, name: &str, extension: &str, size: i64) -> FileDescriptor {
    FileDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        extension: extension.to_string(),
        mime_type: format!("video/{}", extension),
        size,
        channel_id: Some("channel1".to_string()),
        creator_id: Some("user1".to_string()),
        ..Default::default()
    }
}

/// A message in `channel1` by `user1` carrying `file_ids`.
pub fn post_with_files(id: &str, file_ids: &[&str]) -> Post {
    Post {
        id: id.to_string(),
        channel_id: "channel1".to_string(),
        user_id: "user1".to_string(),
        message: "look at this".to_string(),
        file_ids: file_ids.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

/// Destination stream that rejects every write.
pub struct FailingWriter;

impl AsyncWrite for FailingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "destination closed",
        )))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Source stream that fails on the first read.
pub struct FailingReader;

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "upload stream reset",
        )))
    }
}
