//! Pipeline error types.

use millrace_core::{BoxError, TemplateError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from building or invoking a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// `done()` was called on a builder with no steps.
    #[error("pipeline has no steps")]
    Empty,

    /// The invocation initializer failed.
    ///
    /// Step-function failures are not a variant here: they happen while the
    /// result is already streaming and surface as read errors on the
    /// result's stream instead.
    #[error("initializer failed: {0}")]
    Init(#[source] BoxError),

    /// A cache file could not be opened, read, or written.
    #[error("cache I/O error for '{path}': {source}")]
    Cache {
        /// The resolved cache path involved.
        path: PathBuf,
        /// The underlying filesystem failure.
        #[source]
        source: std::io::Error,
    },

    /// A cache-path template did not resolve against the invocation
    /// variables.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// No readable stream is available: the result was already consumed.
    /// A normal-but-empty outcome, not a crash; the delivery boundary maps
    /// it to an explicit empty response.
    #[error("no result available")]
    NoResult,
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Whether this is the distinguished "no result available" condition.
    pub fn is_no_result(&self) -> bool {
        matches!(self, Self::NoResult)
    }
}
