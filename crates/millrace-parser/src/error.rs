//! Parser error types.

use millrace_core::BoxError;
use thiserror::Error;

/// Errors from a splitter run.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The input stream failed mid-read.
    #[error("input error: {0}")]
    Io(#[from] std::io::Error),

    /// The record handler rejected a record. The first such error halts the
    /// run; later records are never handled.
    #[error("record handler failed: {0}")]
    Handler(#[source] BoxError),
}

/// Result type for splitter runs.
pub type Result<T> = std::result::Result<T, ParseError>;
