//! Transform error types.

use millrace_core::{BoxError, SinkError};
use millrace_hooks::HookError;
use millrace_parser::ParseError;
use thiserror::Error;

/// Errors from a transform run. The first error halts the run; no further
/// records are processed.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Input framing or input stream failure.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A pre- or post-hook failed.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// The caller's operation failed.
    #[error("operation failed: {0}")]
    Operation(#[source] BoxError),

    /// A record could not be decoded as JSON, or an emitted value could not
    /// be encoded.
    #[error("malformed JSON record: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing serialized output failed.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Result type for transform runs.
pub type Result<T> = std::result::Result<T, TransformError>;
