//! Hook error types.

use crate::registry::Stage;
use millrace_core::BoxError;
use thiserror::Error;

/// A hook in a composed chain failed. Carries the full hook identity so the
/// failing link is attributable from the error alone.
#[derive(Debug, Error)]
#[error("hook {namespace}/{stage}:{name} failed: {source}")]
pub struct HookError {
    /// Namespace the hook was registered under.
    pub namespace: String,
    /// Pre or post.
    pub stage: Stage,
    /// Operation name the hook intercepts.
    pub name: String,
    /// The hook's own failure.
    #[source]
    pub source: BoxError,
}

/// Result type for hook application.
pub type Result<T> = std::result::Result<T, HookError>;
