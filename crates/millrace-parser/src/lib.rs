//! # Millrace Parser
//!
//! Turns a raw byte stream plus a separator byte into an ordered sequence of
//! text records, invoking a caller-supplied asynchronous handler once per
//! record, strictly in arrival order.
//!
//! The splitter is the bottom of the millrace stack: transformers drive it
//! with a newline (or caller-chosen) separator and do their per-record work
//! inside the handler. Guarantees:
//!
//! - records are handled in exactly the order they occur in the input, with
//!   at most one `handle` call in flight, regardless of how input chunks are
//!   delivered;
//! - memory is bounded by the largest unterminated record, not total input;
//! - a trailing unterminated run at end-of-stream is a final record;
//! - the first handler error halts the run; no further records are handled.

mod error;
mod splitter;

pub use error::{ParseError, Result};
pub use splitter::{split_lines, FnHandler, RecordHandler, RecordSplitter};
