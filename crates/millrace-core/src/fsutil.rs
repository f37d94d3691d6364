//! Filesystem primitives used by the pipeline engine.
//!
//! The engine needs exactly four things from the filesystem: an existence
//! check, parent-directory creation, a readable byte stream, and a writable
//! file. Everything else (partial-file commit, tee fan-out) is built on top
//! in [`crate::sink`].

use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Whether a file exists at `path`. Errors (permissions, dangling links)
/// count as absent: the caller will fall through to recomputing.
pub async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Create the parent directory of `path`, recursively, if it is missing.
pub async fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Open `path` as a stream of byte chunks.
pub async fn open_for_read(path: &Path) -> io::Result<ReaderStream<File>> {
    let file = File::open(path).await?;
    Ok(ReaderStream::new(file))
}

/// Create (or truncate) `path` for writing.
pub async fn open_for_write(path: &Path) -> io::Result<File> {
    File::create(path).await
}
