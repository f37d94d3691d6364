//! # Millrace Hooks
//!
//! Named interception functions composed around transformer operations.
//!
//! A hook is a function `(payload, vars) -> payload'` identified by
//! `(namespace, stage, name)`. Registering several hooks under the same
//! identity chains them in registration order, each consuming the previous
//! hook's output, with the same invocation variables passed unchanged to
//! every link.
//!
//! The registry is an explicit object: build it once at startup, register
//! everything, then share it behind an `Arc`. There is no removal API and
//! no global state; steady-state operation only reads.
//!
//! ```rust
//! use millrace_hooks::{hook_fn, HookRegistry, Stage};
//! use millrace_core::{Payload, Vars};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut registry = HookRegistry::new();
//! registry.register("feeds", Stage::Pre, "normalize", hook_fn(|payload, _vars| {
//!     match payload {
//!         Payload::Text(s) => Ok(Payload::Text(s.trim().to_string())),
//!         other => Ok(other),
//!     }
//! }));
//!
//! let pre = registry.compose("feeds", Stage::Pre, "normalize");
//! let out = pre.apply(Payload::Text("  x  ".into()), &Vars::new()).await.unwrap();
//! assert_eq!(out, Payload::Text("x".into()));
//! # }
//! ```

mod error;
mod registry;

pub use error::{HookError, Result};
pub use registry::{hook_fn, Composed, Hook, HookRegistry, Stage};
