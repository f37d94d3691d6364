//! The record splitter.

use crate::error::{ParseError, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use millrace_core::BoxError;
use tracing::trace;

/// Per-record callback driven by [`RecordSplitter::run`].
///
/// `handle` is awaited to completion before the next record is extracted,
/// so implementations never see overlapping calls and may hold mutable
/// state without synchronization.
#[async_trait]
pub trait RecordHandler: Send {
    /// Process one decoded record.
    async fn handle(&mut self, record: String) -> std::result::Result<(), BoxError>;
}

/// Adapts a synchronous closure into a [`RecordHandler`]. Handy for tests
/// and for transforms with no await points.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> RecordHandler for FnHandler<F>
where
    F: FnMut(String) -> std::result::Result<(), BoxError> + Send,
{
    async fn handle(&mut self, record: String) -> std::result::Result<(), BoxError> {
        (self.0)(record)
    }
}

/// Splits a byte stream into separator-delimited records.
#[derive(Debug, Clone, Copy)]
pub struct RecordSplitter {
    separator: u8,
}

impl RecordSplitter {
    /// A splitter cutting on `separator`.
    pub fn new(separator: u8) -> Self {
        Self { separator }
    }

    /// The separator byte this splitter cuts on.
    pub fn separator(&self) -> u8 {
        self.separator
    }

    /// Drive `handler` over every record in `input`, in order.
    ///
    /// Each input chunk is appended to an internal buffer and the buffer is
    /// scanned for separators; every complete record is decoded as (lossy)
    /// UTF-8 and handed to `handler`, one at a time. Consumed bytes are
    /// discarded immediately, so the buffer never holds more than the
    /// largest unterminated record. When the input ends, a non-empty
    /// remainder is emitted as a final record even without a trailing
    /// separator.
    ///
    /// Returns the number of records handled.
    ///
    /// # Errors
    ///
    /// The first input or handler error halts the run: no further input is
    /// consumed and no further records are handled.
    pub async fn run<S, H>(&self, mut input: S, handler: &mut H) -> Result<usize>
    where
        S: Stream<Item = std::io::Result<Bytes>> + Unpin,
        H: RecordHandler + ?Sized,
    {
        let mut buf = BytesMut::new();
        let mut count = 0usize;

        while let Some(chunk) = input.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            buf.extend_from_slice(&chunk);

            while let Some(pos) = buf.iter().position(|&b| b == self.separator) {
                let record = buf.split_to(pos + 1);
                let record = decode(&record[..record.len() - 1]);
                trace!(len = record.len(), "record");
                handler.handle(record).await.map_err(ParseError::Handler)?;
                count += 1;
            }
        }

        // Trailing unterminated run at end-of-stream is a final record.
        if !buf.is_empty() {
            let record = decode(&buf.split_to(buf.len()));
            trace!(len = record.len(), "trailing record");
            handler.handle(record).await.map_err(ParseError::Handler)?;
            count += 1;
        }

        Ok(count)
    }
}

/// Split on newlines: `RecordSplitter::new(b'\n')`.
pub async fn split_lines<S, H>(input: S, handler: &mut H) -> Result<usize>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
    H: RecordHandler + ?Sized,
{
    RecordSplitter::new(b'\n').run(input, handler).await
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
