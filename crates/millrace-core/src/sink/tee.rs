//! Tee: one write, two destinations.

use super::channel::ChannelSink;
use super::error::SinkResult;
use super::file::FileSink;
use super::traits::ByteSink;
use async_trait::async_trait;
use bytes::Bytes;

/// Duplicates every chunk to a cache file and a downstream channel.
///
/// The file write happens first, in the caller's task, so the bytes on disk
/// and the bytes the downstream reader sees are the same sequence in the
/// same order. Closing commits the file and ends the channel; aborting
/// removes the partial file and ends the channel without publishing.
pub struct TeeSink {
    file: FileSink,
    downstream: ChannelSink,
}

impl TeeSink {
    /// Fan writes out to `file` and `downstream`.
    pub fn new(file: FileSink, downstream: ChannelSink) -> Self {
        Self { file, downstream }
    }

    /// The cache path the file side commits to.
    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }
}

#[async_trait]
impl ByteSink for TeeSink {
    async fn write(&mut self, chunk: Bytes) -> SinkResult<()> {
        self.file.write(chunk.clone()).await?;
        self.downstream.write(chunk).await
    }

    async fn close(&mut self) -> SinkResult<()> {
        self.file.close().await?;
        self.downstream.close().await
    }

    async fn abort(&mut self) -> SinkResult<()> {
        self.file.abort().await?;
        self.downstream.close().await
    }
}
