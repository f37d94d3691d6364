//! Sink error types.

use thiserror::Error;

/// Sink operation errors.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Underlying I/O failure while writing or committing a cache file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sink was written to after `close`.
    #[error("sink closed")]
    Closed,
}

/// Specialized `Result` for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

impl SinkError {
    /// Whether this error indicates a write after close rather than a real
    /// I/O failure.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
