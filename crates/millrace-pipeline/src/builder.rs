//! Pipeline construction and invocation.

use crate::error::{PipelineError, Result};
use crate::result::{evaluate, StepResult};
use crate::step::{Step, StepFn};
use async_trait::async_trait;
use millrace_core::{BoxError, PipelineConfig, Vars};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Produces the invocation variables from the caller's request.
///
/// Returning `Ok(None)` is the "no content" sentinel: the invocation
/// short-circuits without touching any step.
#[async_trait]
pub trait InitFn: Send + Sync {
    /// Derive the variables for one invocation.
    async fn init(&self, request: Value) -> std::result::Result<Option<Vars>, BoxError>;
}

struct FnInit<F>(F);

#[async_trait]
impl<F> InitFn for FnInit<F>
where
    F: Fn(Value) -> std::result::Result<Option<Vars>, BoxError> + Send + Sync,
{
    async fn init(&self, request: Value) -> std::result::Result<Option<Vars>, BoxError> {
        (self.0)(request)
    }
}

/// Adapt a plain closure into an [`InitFn`].
pub fn init_fn<F>(f: F) -> Arc<dyn InitFn>
where
    F: Fn(Value) -> std::result::Result<Option<Vars>, BoxError> + Send + Sync + 'static,
{
    Arc::new(FnInit(f))
}

/// Default initializer: a JSON object request becomes the variable set
/// verbatim; anything else yields an empty set.
struct DefaultInit;

#[async_trait]
impl InitFn for DefaultInit {
    async fn init(&self, request: Value) -> std::result::Result<Option<Vars>, BoxError> {
        Ok(Some(match request {
            Value::Object(map) => Vars::from(map),
            _ => Vars::new(),
        }))
    }
}

/// Last-mile adapter applied to `(vars, result)` before an invocation
/// returns.
pub type PostFn = Arc<dyn Fn(&Vars, StepResult) -> StepResult + Send + Sync>;

/// Assembles a chain of steps into a reusable [`Pipeline`].
pub struct PipelineBuilder {
    steps: Vec<Step>,
    init: Option<Arc<dyn InitFn>>,
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            init: None,
            config: PipelineConfig::default(),
        }
    }

    /// Start the chain. The opening step never receives an input stream.
    pub fn open(self, op: Arc<dyn StepFn>, cache_template: Option<&str>) -> Self {
        self.step(op, cache_template)
    }

    /// Append a step. It consumes the previous step's output stream.
    pub fn step(mut self, op: Arc<dyn StepFn>, cache_template: Option<&str>) -> Self {
        self.steps
            .push(Step::new(op, cache_template.map(str::to_string)));
        self
    }

    /// Set the per-invocation initializer.
    pub fn init(mut self, init: Arc<dyn InitFn>) -> Self {
        self.init = Some(init);
        self
    }

    /// Set cache root and channel capacity.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Finish with the identity post function.
    pub fn done(self) -> Result<Pipeline> {
        self.done_with(Arc::new(|_vars, result| result))
    }

    /// Finish, validating that at least one step exists.
    pub fn done_with(self, post: PostFn) -> Result<Pipeline> {
        if self.steps.is_empty() {
            return Err(PipelineError::Empty);
        }
        Ok(Pipeline {
            steps: self.steps,
            init: self.init.unwrap_or_else(|| Arc::new(DefaultInit)),
            post,
            config: self.config,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The outcome of one pipeline invocation.
pub enum Invocation {
    /// The initializer signaled "no content"; no step was evaluated.
    NoContent,
    /// The last step's result, ready to stream.
    Ready(StepResult),
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Invocation::NoContent => f.write_str("NoContent"),
            Invocation::Ready(_) => f.write_str("Ready(..)"),
        }
    }
}

impl Invocation {
    /// Whether the initializer short-circuited the invocation.
    pub fn is_no_content(&self) -> bool {
        matches!(self, Invocation::NoContent)
    }

    /// The step result, if there is one.
    pub fn into_result(self) -> Option<StepResult> {
        match self {
            Invocation::NoContent => None,
            Invocation::Ready(result) => Some(result),
        }
    }
}

/// A built pipeline: construct once, invoke per request.
///
/// The pipeline and its steps hold no per-invocation state; every
/// invocation produces its own [`StepResult`] chain.
pub struct Pipeline {
    steps: Vec<Step>,
    init: Arc<dyn InitFn>,
    post: PostFn,
    config: PipelineConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.steps.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Run one invocation: initialize variables, evaluate the last step,
    /// apply the post function.
    pub async fn invoke(&self, request: Value) -> Result<Invocation> {
        let vars = self
            .init
            .init(request)
            .await
            .map_err(PipelineError::Init)?;
        let Some(vars) = vars else {
            debug!("initializer signaled no content");
            return Ok(Invocation::NoContent);
        };

        let vars = Arc::new(vars);
        let result = evaluate(&self.steps, self.steps.len() - 1, &vars, &self.config).await?;
        Ok(Invocation::Ready((self.post)(&vars, result)))
    }

    /// Number of steps in the chain.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false: `done` rejects empty chains.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
