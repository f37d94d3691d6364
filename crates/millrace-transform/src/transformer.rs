//! Record transformation: pre-hook, operation, post-hook, serialize.

use crate::error::TransformError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use millrace_core::{BoxError, ByteSink, Emit, Payload, Vars};
use millrace_hooks::{Composed, HookRegistry, Stage};
use millrace_parser::{ParseError, RecordHandler, RecordSplitter};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// The caller's per-record transformation.
#[async_trait]
pub trait RecordOp: Send + Sync {
    /// Transform one (pre-hooked) record into zero, one, or many payloads.
    async fn apply(&self, input: Payload, vars: &Vars) -> Result<Emit, BoxError>;
}

struct FnOp<F>(F);

#[async_trait]
impl<F> RecordOp for FnOp<F>
where
    F: Fn(Payload, &Vars) -> Result<Emit, BoxError> + Send + Sync,
{
    async fn apply(&self, input: Payload, vars: &Vars) -> Result<Emit, BoxError> {
        (self.0)(input, vars)
    }
}

/// Adapt a plain closure into a [`RecordOp`].
pub fn op_fn<F>(f: F) -> Arc<dyn RecordOp>
where
    F: Fn(Payload, &Vars) -> Result<Emit, BoxError> + Send + Sync + 'static,
{
    Arc::new(FnOp(f))
}

/// Transform behavior switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformOptions {
    /// When set, an [`Emit::Many`] writes one line per element. Without it
    /// the sequence is serialized as a single JSON array line.
    pub multi_value: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Encoding {
    /// Text verbatim, JSON encoded.
    Generic,
    /// Everything JSON-encoded; zero-length input lines skipped.
    JsonLines,
}

struct TransformHandler<'a> {
    pre: Composed,
    post: Composed,
    op: &'a dyn RecordOp,
    vars: &'a Vars,
    sink: &'a mut dyn ByteSink,
    options: TransformOptions,
    encoding: Encoding,
}

impl TransformHandler<'_> {
    async fn process(&mut self, record: String) -> Result<(), TransformError> {
        let input = match self.encoding {
            Encoding::Generic => Payload::Text(record),
            Encoding::JsonLines => {
                if record.is_empty() {
                    return Ok(());
                }
                Payload::Json(serde_json::from_str::<Value>(&record)?)
            }
        };

        let input = self.pre.apply(input, self.vars).await?;
        let emit = self
            .op
            .apply(input, self.vars)
            .await
            .map_err(TransformError::Operation)?;

        match emit {
            Emit::Nothing => Ok(()),
            Emit::One(payload) => {
                let payload = self.post.apply(payload, self.vars).await?;
                self.write_line(&payload).await
            }
            Emit::Many(payloads) => {
                let mut hooked = Vec::with_capacity(payloads.len());
                for payload in payloads {
                    hooked.push(self.post.apply(payload, self.vars).await?);
                }
                if self.options.multi_value {
                    for payload in &hooked {
                        self.write_line(payload).await?;
                    }
                    Ok(())
                } else {
                    let array = Value::Array(hooked.into_iter().map(Payload::into_value).collect());
                    self.write_raw(serde_json::to_string(&array)?).await
                }
            }
        }
    }

    async fn write_line(&mut self, payload: &Payload) -> Result<(), TransformError> {
        let line = match self.encoding {
            Encoding::Generic => payload.render()?,
            Encoding::JsonLines => payload.render_json()?,
        };
        self.write_raw(line).await
    }

    async fn write_raw(&mut self, mut line: String) -> Result<(), TransformError> {
        line.push('\n');
        self.sink.write(Bytes::from(line)).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordHandler for TransformHandler<'_> {
    async fn handle(&mut self, record: String) -> Result<(), BoxError> {
        self.process(record).await.map_err(|e| Box::new(e) as BoxError)
    }
}

#[allow(clippy::too_many_arguments)]
async fn transform_inner<S>(
    input: S,
    sink: &mut dyn ByteSink,
    op: &dyn RecordOp,
    registry: &HookRegistry,
    namespace: &str,
    name: &str,
    vars: &Vars,
    separator: u8,
    options: TransformOptions,
    encoding: Encoding,
) -> Result<(), TransformError>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    // Composites are resolved once per transform, not per record.
    let pre = registry.compose(namespace, Stage::Pre, name);
    let post = registry.compose(namespace, Stage::Post, name);
    debug!(
        namespace,
        name,
        pre_hooks = pre.len(),
        post_hooks = post.len(),
        "transform starting"
    );
    let mut handler = TransformHandler {
        pre,
        post,
        op,
        vars,
        sink,
        options,
        encoding,
    };

    match RecordSplitter::new(separator).run(input, &mut handler).await {
        Ok(_) => Ok(()),
        // Unwrap our own error from the splitter's handler wrapper; anything
        // else really is a parse failure.
        Err(ParseError::Handler(boxed)) => Err(match boxed.downcast::<TransformError>() {
            Ok(own) => *own,
            Err(other) => TransformError::Operation(other),
        }),
        Err(parse) => Err(TransformError::Parse(parse)),
    }
}

/// Transform separator-delimited records with generic serialization.
#[allow(clippy::too_many_arguments)]
pub async fn transform_records<S>(
    input: S,
    sink: &mut dyn ByteSink,
    op: &dyn RecordOp,
    registry: &HookRegistry,
    namespace: &str,
    name: &str,
    vars: &Vars,
    separator: u8,
    options: TransformOptions,
) -> Result<(), TransformError>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    transform_inner(
        input,
        sink,
        op,
        registry,
        namespace,
        name,
        vars,
        separator,
        options,
        Encoding::Generic,
    )
    .await
}

/// Transform newline-delimited records with generic serialization.
#[allow(clippy::too_many_arguments)]
pub async fn transform_lines<S>(
    input: S,
    sink: &mut dyn ByteSink,
    op: &dyn RecordOp,
    registry: &HookRegistry,
    namespace: &str,
    name: &str,
    vars: &Vars,
    options: TransformOptions,
) -> Result<(), TransformError>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    transform_inner(
        input,
        sink,
        op,
        registry,
        namespace,
        name,
        vars,
        b'\n',
        options,
        Encoding::Generic,
    )
    .await
}

/// Transform JSON-per-line records.
///
/// Zero-length lines are skipped without invoking the operation; every
/// other line must parse as JSON. Output payloads are always JSON-encoded,
/// so a text payload becomes a quoted JSON string.
#[allow(clippy::too_many_arguments)]
pub async fn transform_json_lines<S>(
    input: S,
    sink: &mut dyn ByteSink,
    op: &dyn RecordOp,
    registry: &HookRegistry,
    namespace: &str,
    name: &str,
    vars: &Vars,
    options: TransformOptions,
) -> Result<(), TransformError>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    transform_inner(
        input,
        sink,
        op,
        registry,
        namespace,
        name,
        vars,
        b'\n',
        options,
        Encoding::JsonLines,
    )
    .await
}
