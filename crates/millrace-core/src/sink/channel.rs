//! Downstream channel sink.

use super::error::{SinkError, SinkResult};
use super::traits::ByteSink;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::warn;

/// Queues chunks for the downstream reader over a bounded channel.
///
/// The channel provides the backpressure the engine relies on: a step
/// function suspends in `write` until the reader catches up. A reader that
/// has been dropped (the request ended) makes further writes no-ops rather
/// than errors.
pub struct ChannelSink {
    // None once closed; dropping the sender is what signals end-of-stream.
    tx: Option<mpsc::Sender<std::io::Result<Bytes>>>,
    reader_gone: bool,
}

impl ChannelSink {
    /// Create a sink and the receiver its chunks arrive on.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<std::io::Result<Bytes>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::from_sender(tx), rx)
    }

    /// Wrap an existing sender. Lets the engine keep a clone for forwarding
    /// a step failure into the same stream.
    pub fn from_sender(tx: mpsc::Sender<std::io::Result<Bytes>>) -> Self {
        Self {
            tx: Some(tx),
            reader_gone: false,
        }
    }
}

#[async_trait]
impl ByteSink for ChannelSink {
    async fn write(&mut self, chunk: Bytes) -> SinkResult<()> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(SinkError::Closed);
        };
        if self.reader_gone {
            return Ok(());
        }
        if tx.send(Ok(chunk)).await.is_err() {
            // The consuming side ended the request; swallow this and all
            // subsequent writes.
            warn!("downstream reader gone, discarding further output");
            self.reader_gone = true;
        }
        Ok(())
    }

    async fn close(&mut self) -> SinkResult<()> {
        self.tx.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chunks_arrive_in_order_and_channel_ends_on_close() {
        let (mut sink, mut rx) = ChannelSink::channel(4);
        sink.write(Bytes::from_static(b"one")).await.unwrap();
        sink.write(Bytes::from_static(b"two")).await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(rx.recv().await.unwrap().unwrap(), Bytes::from_static(b"one"));
        assert_eq!(rx.recv().await.unwrap().unwrap(), Bytes::from_static(b"two"));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn writes_after_reader_dropped_are_swallowed() {
        let (mut sink, rx) = ChannelSink::channel(1);
        drop(rx);
        sink.write(Bytes::from_static(b"a")).await.unwrap();
        sink.write(Bytes::from_static(b"b")).await.unwrap();
        sink.close().await.unwrap();
    }

    #[tokio::test]
    async fn write_after_close_fails() {
        let (mut sink, _rx) = ChannelSink::channel(1);
        sink.close().await.unwrap();
        let err = sink.write(Bytes::from_static(b"late")).await.unwrap_err();
        assert!(err.is_closed());
    }
}
