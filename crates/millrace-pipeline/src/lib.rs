//! # Millrace Pipeline
//!
//! The orchestrator: a chain of steps, each with a processing function and
//! an optional cache-path template, invoked lazily from the tail.
//!
//! ## Evaluation
//!
//! Invoking a pipeline evaluates its **last** step. Each step first checks
//! its own resolved cache file:
//!
//! - **cache hit** - the file is served as-is and upstream steps are never
//!   evaluated. A pipeline whose final step is cached short-circuits the
//!   entire chain.
//! - **cache miss** - the preceding step is evaluated the same way, its
//!   readable stream is handed to this step's function, and everything the
//!   function writes is teed: to the cache file (committed atomically on
//!   close) and to the downstream reader.
//!
//! Steps are held in an ordered sequence indexed by position, so the chain
//! is acyclic by construction. Pipelines are built once at startup and
//! invoked many times; all per-invocation state lives in [`StepResult`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! let pipeline = PipelineBuilder::new()
//!     .open(fetch, None)
//!     .step(render, Some("pages/{slug}.html"))
//!     .init(init_fn(|request| { /* request -> Vars, or None for no content */ }))
//!     .done()?;
//!
//! match pipeline.invoke(request).await? {
//!     Invocation::NoContent => { /* explicit empty response */ }
//!     Invocation::Ready(mut result) => {
//!         let stream = result.readable()?;
//!         /* drain it */
//!     }
//! }
//! ```

mod builder;
mod error;
mod result;
mod step;

pub use builder::{init_fn, InitFn, Invocation, Pipeline, PipelineBuilder, PostFn};
pub use error::{PipelineError, Result};
pub use result::{Outcome, StepResult};
pub use step::{Step, StepFn};

pub use millrace_core::PipelineConfig;
