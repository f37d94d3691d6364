//! The sink contract.

use super::error::SinkResult;
use async_trait::async_trait;
use bytes::Bytes;

/// An ordered byte destination with an explicit end.
///
/// Chunks arrive in the order `write` is called; `close` marks the output
/// complete and commits it (for a file sink, flush and rename into place).
/// `close` is idempotent. `abort` tears the sink down without committing,
/// for the error path: a file sink removes its partial file instead of
/// publishing it.
#[async_trait]
pub trait ByteSink: Send {
    /// Append a chunk.
    ///
    /// # Errors
    ///
    /// [`SinkError::Closed`](super::SinkError::Closed) after `close`;
    /// I/O errors from the destination. A downstream reader that has gone
    /// away is not an error (see [`ChannelSink`](super::ChannelSink)).
    async fn write(&mut self, chunk: Bytes) -> SinkResult<()>;

    /// Flush buffered bytes and commit the output. Idempotent.
    async fn close(&mut self) -> SinkResult<()>;

    /// Tear down without committing. Idempotent, best-effort.
    async fn abort(&mut self) -> SinkResult<()> {
        self.close().await
    }
}
