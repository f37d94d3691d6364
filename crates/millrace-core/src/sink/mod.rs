//! Byte sinks: the write side of a step.
//!
//! A step's processing function produces its output through a [`ByteSink`]:
//! an explicit `write(bytes)` / `close()` contract. The engine fans that
//! contract out to the concrete destinations:
//!
//! - [`FileSink`] - a cache file, written to a `.partial` sibling and renamed
//!   into place on close so a half-written artifact is never visible at the
//!   final path;
//! - [`ChannelSink`] - a bounded channel to the downstream reader (the next
//!   step, or the invocation's caller);
//! - [`TeeSink`] - both at once, file first, so the cache file and the
//!   downstream reader observe identical byte sequences.
//!
//! `close` is idempotent; the underlying file handle is released exactly
//! once. Writes to a downstream whose reader has gone away are swallowed:
//! a consumer that stops reading ends the request, it does not fail it.

mod channel;
mod error;
mod file;
mod tee;
mod traits;

pub use channel::ChannelSink;
pub use error::{SinkError, SinkResult};
pub use file::FileSink;
pub use tee::TeeSink;
pub use traits::ByteSink;
