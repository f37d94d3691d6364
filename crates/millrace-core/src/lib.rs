//! # Millrace Core
//!
//! Shared vocabulary for the millrace streaming pipeline.
//!
//! This crate holds the types every other millrace crate speaks:
//! - **Invocation variables** ([`Vars`]): the per-call parameter set produced
//!   by a pipeline's initializer and threaded through every step, hook, and
//!   cache-path resolution.
//! - **Record payloads** ([`Payload`], [`Emit`]): the tagged result type a
//!   transformer operation produces, replacing runtime type inspection with
//!   an explicit text-vs-JSON tag.
//! - **Byte sinks** ([`sink`]): the `write`/`close` contract a step writes
//!   its output through, with file, channel, and tee implementations.
//! - **Filesystem primitives** ([`fsutil`]) and **cache-path templates**
//!   ([`template`]): the simple collaborators the pipeline engine needs from
//!   its environment.
//!
//! Infrastructure crates (`millrace-parser`, `millrace-hooks`,
//! `millrace-transform`) and the orchestrator (`millrace-pipeline`) all
//! depend on this crate and never on each other's internals.

pub mod config;
pub mod fsutil;
pub mod record;
pub mod sink;
pub mod template;
pub mod vars;

pub use config::PipelineConfig;
pub use record::{Emit, Payload};
pub use sink::{ByteSink, ChannelSink, FileSink, SinkError, SinkResult, TeeSink};
pub use template::TemplateError;
pub use vars::Vars;

/// Boxed error type for caller-supplied functions (hooks, operations,
/// initializers, step functions).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A pinned, boxed stream of byte chunks: the currency every step reads and
/// every readable result exposes. Errors are `std::io::Error` so that
/// missing-file reads stay classifiable at the delivery boundary.
pub type ByteStream = futures::stream::BoxStream<'static, std::io::Result<bytes::Bytes>>;
