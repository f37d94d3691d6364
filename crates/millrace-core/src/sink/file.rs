//! Cache-file sink with partial-then-rename commit.

use super::error::{SinkError, SinkResult};
use super::traits::ByteSink;
use crate::fsutil;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

/// Writes a cache file.
///
/// Bytes go to `<path>.partial`; `close` flushes and renames the partial
/// into place, so the final path either does not exist or holds a complete
/// artifact. `abort` removes the partial without publishing anything.
pub struct FileSink {
    final_path: PathBuf,
    partial_path: PathBuf,
    // None once closed or aborted; guards the exactly-once handle release.
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Open a sink for `path`, creating parent directories as needed.
    pub async fn create(path: impl Into<PathBuf>) -> SinkResult<Self> {
        let final_path = path.into();
        let partial_path = partial_path_for(&final_path);

        fsutil::ensure_parent_dir(&final_path).await?;
        let file = fsutil::open_for_write(&partial_path).await?;
        debug!(path = %final_path.display(), "opened cache file for writing");

        Ok(Self {
            final_path,
            partial_path,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// The final path this sink commits to.
    pub fn path(&self) -> &Path {
        &self.final_path
    }
}

fn partial_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".partial");
    PathBuf::from(os)
}

#[async_trait]
impl ByteSink for FileSink {
    async fn write(&mut self, chunk: Bytes) -> SinkResult<()> {
        let writer = self.writer.as_mut().ok_or(SinkError::Closed)?;
        writer.write_all(&chunk).await?;
        Ok(())
    }

    async fn close(&mut self) -> SinkResult<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer.flush().await?;
        writer.into_inner().sync_all().await?;
        tokio::fs::rename(&self.partial_path, &self.final_path).await?;
        debug!(path = %self.final_path.display(), "cache file committed");
        Ok(())
    }

    async fn abort(&mut self) -> SinkResult<()> {
        if self.writer.take().is_none() {
            return Ok(());
        }
        if let Err(e) = tokio::fs::remove_file(&self.partial_path).await {
            warn!(
                path = %self.partial_path.display(),
                error = %e,
                "failed to remove partial cache file"
            );
        }
        Ok(())
    }
}
