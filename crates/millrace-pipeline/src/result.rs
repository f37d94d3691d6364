//! Per-invocation step evaluation.
//!
//! A [`StepResult`] is ephemeral: it exists for one invocation, decides
//! exactly once between serving the step's cache file and running the
//! step's function, and hands its byte stream to exactly one consumer.

use crate::error::{PipelineError, Result};
use crate::step::Step;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::StreamExt;
use millrace_core::{
    fsutil, template, ByteSink, ByteStream, ChannelSink, FileSink, PipelineConfig, SinkError,
    TeeSink, Vars,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error};

/// How a step's bytes were obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The resolved cache file existed; it is served as-is and no upstream
    /// step was evaluated.
    CacheHit {
        /// The existing cache file.
        path: PathBuf,
    },
    /// The step's function ran; its output is teed to `cache_path` when one
    /// is configured.
    Computed {
        /// Where the output is being cached, if anywhere.
        cache_path: Option<PathBuf>,
    },
}

/// The lazily-computed, possibly cached outcome of one step for one
/// invocation.
pub struct StepResult {
    outcome: Outcome,
    // Taken by the first `readable()` call.
    stream: Option<ByteStream>,
}

impl StepResult {
    /// Wrap an already-produced stream. Useful for delivery-layer callers
    /// and tests that need a result without running a pipeline.
    pub fn from_stream(stream: ByteStream, outcome: Outcome) -> Self {
        Self {
            outcome,
            stream: Some(stream),
        }
    }

    /// How the bytes were obtained.
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// The cache path involved, whether hit or being written.
    pub fn cache_path(&self) -> Option<&Path> {
        match &self.outcome {
            Outcome::CacheHit { path } => Some(path),
            Outcome::Computed { cache_path } => cache_path.as_deref(),
        }
    }

    /// Whether the cache file was served without running the step.
    pub fn is_cache_hit(&self) -> bool {
        matches!(self.outcome, Outcome::CacheHit { .. })
    }

    /// Take the readable stream. Each result yields its stream once;
    /// asking again is the distinguished no-result condition.
    pub fn readable(&mut self) -> Result<ByteStream> {
        self.stream.take().ok_or(PipelineError::NoResult)
    }
}

/// Evaluate the step at `index`, recursing upstream only on a cache miss.
///
/// Boxed because async recursion needs an indirection; the recursion depth
/// is the chain length, fixed at build time.
pub(crate) fn evaluate<'a>(
    steps: &'a [Step],
    index: usize,
    vars: &'a Arc<Vars>,
    config: &'a PipelineConfig,
) -> BoxFuture<'a, Result<StepResult>> {
    Box::pin(async move {
        let step = &steps[index];

        let cache_path = step
            .cache_template()
            .map(|t| resolve_cache_path(t, vars, config))
            .transpose()?;

        // CHECK_CACHE
        if let Some(path) = &cache_path {
            if fsutil::exists(path).await {
                debug!(step = index, path = %path.display(), "cache hit");
                let stream = fsutil::open_for_read(path)
                    .await
                    .map_err(|e| cache_error(path, e))?;
                return Ok(StepResult::from_stream(
                    stream.boxed(),
                    Outcome::CacheHit { path: path.clone() },
                ));
            }
            debug!(step = index, path = %path.display(), "cache miss");
        }

        // CACHE_MISS: upstream first. Its stream transfers nothing until the
        // step function polls it.
        let upstream = match index {
            0 => None,
            _ => Some(evaluate(steps, index - 1, vars, config).await?.readable()?),
        };

        let (tx, rx) = mpsc::channel::<std::io::Result<Bytes>>(config.channel_capacity.max(1));
        let err_tx = tx.clone();

        let mut sink: Box<dyn ByteSink> = match &cache_path {
            Some(path) => {
                let file = FileSink::create(path)
                    .await
                    .map_err(|e| sink_to_cache_error(path, e))?;
                Box::new(TeeSink::new(file, ChannelSink::from_sender(tx)))
            }
            None => Box::new(ChannelSink::from_sender(tx)),
        };

        let op = step.op();
        let vars = vars.clone();
        tokio::spawn(async move {
            match op.run(vars, sink.as_mut(), upstream).await {
                Ok(()) => {
                    if let Err(e) = sink.close().await {
                        error!(step = index, error = %e, "failed to commit step output");
                        let _ = err_tx.send(Err(std::io::Error::other(e))).await;
                    }
                }
                Err(e) => {
                    error!(step = index, error = %e, "step function failed");
                    // Tear the sink down first so a reader observing the
                    // error never sees a leftover partial file.
                    let _ = sink.abort().await;
                    let _ = err_tx
                        .send(Err(std::io::Error::other(format!(
                            "step {index} failed: {e}"
                        ))))
                        .await;
                }
            }
        });

        Ok(StepResult::from_stream(
            ReceiverStream::new(rx).boxed(),
            Outcome::Computed { cache_path },
        ))
    })
}

fn resolve_cache_path(
    template: &str,
    vars: &Vars,
    config: &PipelineConfig,
) -> Result<PathBuf> {
    let path = template::resolve(template, vars)?;
    Ok(match &config.cache_root {
        Some(root) if path.is_relative() => root.join(path),
        _ => path,
    })
}

fn cache_error(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::Cache {
        path: path.to_path_buf(),
        source,
    }
}

fn sink_to_cache_error(path: &Path, source: SinkError) -> PipelineError {
    match source {
        SinkError::Io(e) => cache_error(path, e),
        SinkError::Closed => cache_error(path, std::io::Error::other("sink closed")),
    }
}
