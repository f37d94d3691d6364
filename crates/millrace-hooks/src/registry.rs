//! The hook registry and composition.

use crate::error::{HookError, Result};
use async_trait::async_trait;
use millrace_core::{BoxError, Payload, Vars};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Interception stage relative to the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Runs before the operation, on its input.
    Pre,
    /// Runs after the operation, on each emitted payload.
    Post,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Pre => "pre",
            Stage::Post => "post",
        })
    }
}

/// One interception function.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Transform a payload. The variables are the invocation's and arrive
    /// unchanged at every hook in a chain.
    async fn apply(&self, payload: Payload, vars: &Vars) -> std::result::Result<Payload, BoxError>;
}

struct FnHook<F>(F);

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn(Payload, &Vars) -> std::result::Result<Payload, BoxError> + Send + Sync,
{
    async fn apply(&self, payload: Payload, vars: &Vars) -> std::result::Result<Payload, BoxError> {
        (self.0)(payload, vars)
    }
}

/// Adapt a plain closure into a [`Hook`].
pub fn hook_fn<F>(f: F) -> Arc<dyn Hook>
where
    F: Fn(Payload, &Vars) -> std::result::Result<Payload, BoxError> + Send + Sync + 'static,
{
    Arc::new(FnHook(f))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HookKey {
    namespace: String,
    stage: Stage,
    name: String,
}

/// Ordered lists of hooks keyed by `(namespace, stage, name)`.
///
/// Registration happens at process initialization; afterwards the registry
/// is shared behind an `Arc` and only read.
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<HookKey, Vec<Arc<dyn Hook>>>,
}

impl HookRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook under `(namespace, stage, name)`. Hooks registered
    /// under the same identity run in registration order.
    pub fn register(
        &mut self,
        namespace: impl Into<String>,
        stage: Stage,
        name: impl Into<String>,
        hook: Arc<dyn Hook>,
    ) {
        let key = HookKey {
            namespace: namespace.into(),
            stage,
            name: name.into(),
        };
        debug!(namespace = %key.namespace, %stage, name = %key.name, "hook registered");
        self.hooks.entry(key).or_default().push(hook);
    }

    /// Compose every hook registered under `(namespace, stage, name)` into
    /// a single callable: the identity when none are registered, the hook
    /// itself when exactly one is, and an in-order chain otherwise.
    pub fn compose(&self, namespace: &str, stage: Stage, name: &str) -> Composed {
        let key = HookKey {
            namespace: namespace.to_string(),
            stage,
            name: name.to_string(),
        };
        let inner = match self.hooks.get(&key) {
            None => ComposedKind::Identity,
            Some(hooks) if hooks.len() == 1 => ComposedKind::Single(hooks[0].clone()),
            Some(hooks) => ComposedKind::Chain(hooks.clone()),
        };
        Composed {
            namespace: key.namespace,
            stage,
            name: key.name,
            inner,
        }
    }
}

enum ComposedKind {
    Identity,
    Single(Arc<dyn Hook>),
    Chain(Vec<Arc<dyn Hook>>),
}

/// The composed form of every hook under one identity.
pub struct Composed {
    namespace: String,
    stage: Stage,
    name: String,
    inner: ComposedKind,
}

impl Composed {
    /// Apply the composition: each hook consumes the previous output.
    pub async fn apply(&self, payload: Payload, vars: &Vars) -> Result<Payload> {
        match &self.inner {
            ComposedKind::Identity => Ok(payload),
            ComposedKind::Single(hook) => {
                hook.apply(payload, vars).await.map_err(|e| self.error(e))
            }
            ComposedKind::Chain(hooks) => {
                let mut value = payload;
                for hook in hooks {
                    value = hook.apply(value, vars).await.map_err(|e| self.error(e))?;
                }
                Ok(value)
            }
        }
    }

    /// Whether no hooks are registered under this identity.
    pub fn is_identity(&self) -> bool {
        matches!(self.inner, ComposedKind::Identity)
    }

    /// Number of hooks in the composition.
    pub fn len(&self) -> usize {
        match &self.inner {
            ComposedKind::Identity => 0,
            ComposedKind::Single(_) => 1,
            ComposedKind::Chain(hooks) => hooks.len(),
        }
    }

    /// Whether the composition is empty (same as [`is_identity`](Self::is_identity)).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn error(&self, source: BoxError) -> HookError {
        HookError {
            namespace: self.namespace.clone(),
            stage: self.stage,
            name: self.name.clone(),
            source,
        }
    }
}
