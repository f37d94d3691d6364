//! # Millrace Transform
//!
//! Transformers layer the record splitter with hook invocation and output
//! serialization: every record is run through the composed pre-hooks, the
//! caller's operation, and the composed post-hooks, then serialized to a
//! byte sink one line per emitted payload.
//!
//! Three entry points cover the common shapes:
//! - [`transform_records`] - any separator byte, generic serialization
//!   (text verbatim, JSON encoded);
//! - [`transform_lines`] - newline separator, generic serialization;
//! - [`transform_json_lines`] - newline separator, every non-empty line
//!   parsed as JSON before the operation, every output JSON-encoded, and
//!   zero-length lines skipped without invoking the operation.
//!
//! The caller owns the sink: a transform writes but never closes it, so a
//! step function can run several transforms into one output.

mod error;
mod transformer;

pub use error::{Result, TransformError};
pub use transformer::{
    op_fn, transform_json_lines, transform_lines, transform_records, RecordOp, TransformOptions,
};
