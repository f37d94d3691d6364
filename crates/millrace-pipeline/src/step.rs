//! Step descriptors.

use async_trait::async_trait;
use millrace_core::{BoxError, ByteSink, ByteStream, Vars};
use std::sync::Arc;

/// A step's processing function.
///
/// Receives the invocation variables, the output sink (already wired to the
/// cache file and the downstream reader), and the upstream step's readable
/// stream (`None` for the first step in a chain). The stream is pull-based:
/// no upstream data flows until the function reads it, so listeners are
/// always attached before bytes move.
///
/// The engine closes the sink after the function returns; closing it early
/// from inside the function is allowed (close is idempotent).
#[async_trait]
pub trait StepFn: Send + Sync {
    /// Produce this step's output.
    async fn run(
        &self,
        vars: Arc<Vars>,
        output: &mut dyn ByteSink,
        input: Option<ByteStream>,
    ) -> Result<(), BoxError>;
}

/// One named point in a pipeline: a processing function and an optional
/// cache-path template, unresolved until invocation time.
///
/// Steps hold no per-invocation state; the same `Step` serves every
/// invocation of its pipeline.
pub struct Step {
    op: Arc<dyn StepFn>,
    cache_template: Option<String>,
}

impl Step {
    pub(crate) fn new(op: Arc<dyn StepFn>, cache_template: Option<String>) -> Self {
        Self { op, cache_template }
    }

    pub(crate) fn op(&self) -> Arc<dyn StepFn> {
        self.op.clone()
    }

    /// The unresolved cache-path template, if the step caches.
    pub fn cache_template(&self) -> Option<&str> {
        self.cache_template.as_deref()
    }
}
