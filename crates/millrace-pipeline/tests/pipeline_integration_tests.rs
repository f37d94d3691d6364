//! Integration tests for the pipeline engine: cache short-circuiting, tee
//! correctness, no-content signaling, and failure propagation.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use millrace_core::{BoxError, ByteSink, ByteStream, PipelineConfig, Vars};
use millrace_pipeline::{init_fn, PipelineBuilder, PipelineError, StepFn};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Mock steps
// ============================================================================

/// Source step: writes fixed bytes, counts invocations.
struct EmitBytes {
    bytes: &'static [u8],
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl StepFn for EmitBytes {
    async fn run(
        &self,
        _vars: Arc<Vars>,
        output: &mut dyn ByteSink,
        _input: Option<ByteStream>,
    ) -> Result<(), BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        output.write(Bytes::from_static(self.bytes)).await?;
        Ok(())
    }
}

/// Transform step: uppercases every byte of its upstream, counts invocations.
struct Uppercase {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl StepFn for Uppercase {
    async fn run(
        &self,
        _vars: Arc<Vars>,
        output: &mut dyn ByteSink,
        input: Option<ByteStream>,
    ) -> Result<(), BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut input = input.expect("uppercase step needs an upstream");
        while let Some(chunk) = input.next().await {
            let chunk = chunk?;
            output
                .write(Bytes::from(chunk.to_ascii_uppercase()))
                .await?;
        }
        Ok(())
    }
}

/// Step that fails after writing a little output.
struct FailAfter {
    prefix: &'static [u8],
}

#[async_trait]
impl StepFn for FailAfter {
    async fn run(
        &self,
        _vars: Arc<Vars>,
        output: &mut dyn ByteSink,
        _input: Option<ByteStream>,
    ) -> Result<(), BoxError> {
        output.write(Bytes::from_static(self.prefix)).await?;
        Err("deliberate failure".into())
    }
}

async fn drain(mut stream: ByteStream) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn cached_final_step_short_circuits_the_entire_chain() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("out")).unwrap();
    std::fs::write(dir.path().join("out/hi.txt"), b"from cache").unwrap();

    let source_calls = counter();
    let render_calls = counter();
    let pipeline = PipelineBuilder::new()
        .open(
            Arc::new(EmitBytes {
                bytes: b"fresh",
                calls: source_calls.clone(),
            }),
            None,
        )
        .step(
            Arc::new(Uppercase {
                calls: render_calls.clone(),
            }),
            Some("out/{slug}.txt"),
        )
        .config(PipelineConfig::with_cache_root(dir.path()))
        .done()
        .unwrap();

    let mut result = pipeline
        .invoke(json!({"slug": "hi"}))
        .await
        .unwrap()
        .into_result()
        .unwrap();

    assert!(result.is_cache_hit());
    let bytes = drain(result.readable().unwrap()).await.unwrap();
    assert_eq!(bytes, b"from cache");

    // Neither step function ran.
    assert_eq!(source_calls.load(Ordering::SeqCst), 0);
    assert_eq!(render_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cached_upstream_feeds_the_next_step_without_recomputing() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("source.txt"), b"cached input").unwrap();

    let source_calls = counter();
    let render_calls = counter();
    let pipeline = PipelineBuilder::new()
        .open(
            Arc::new(EmitBytes {
                bytes: b"never used",
                calls: source_calls.clone(),
            }),
            Some("source.txt"),
        )
        .step(
            Arc::new(Uppercase {
                calls: render_calls.clone(),
            }),
            None,
        )
        .config(PipelineConfig::with_cache_root(dir.path()))
        .done()
        .unwrap();

    let mut result = pipeline
        .invoke(Value::Null)
        .await
        .unwrap()
        .into_result()
        .unwrap();
    let bytes = drain(result.readable().unwrap()).await.unwrap();

    assert_eq!(bytes, b"CACHED INPUT");
    assert_eq!(source_calls.load(Ordering::SeqCst), 0);
    assert_eq!(render_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tee_writes_the_cache_file_and_the_downstream_identically() {
    let dir = TempDir::new().unwrap();

    let calls = counter();
    let pipeline = PipelineBuilder::new()
        .open(
            Arc::new(EmitBytes {
                bytes: b"tee me, twice",
                calls: calls.clone(),
            }),
            Some("artifacts/{slug}.bin"),
        )
        .config(PipelineConfig::with_cache_root(dir.path()))
        .done()
        .unwrap();

    let mut result = pipeline
        .invoke(json!({"slug": "first"}))
        .await
        .unwrap()
        .into_result()
        .unwrap();
    assert!(!result.is_cache_hit());

    let streamed = drain(result.readable().unwrap()).await.unwrap();
    let cached = std::fs::read(dir.path().join("artifacts/first.bin")).unwrap();

    assert_eq!(streamed, b"tee me, twice");
    assert_eq!(cached, streamed);
}

#[tokio::test]
async fn second_invocation_serves_the_cache_without_rerunning() {
    let dir = TempDir::new().unwrap();

    let calls = counter();
    let pipeline = PipelineBuilder::new()
        .open(
            Arc::new(EmitBytes {
                bytes: b"computed once",
                calls: calls.clone(),
            }),
            Some("once.txt"),
        )
        .config(PipelineConfig::with_cache_root(dir.path()))
        .done()
        .unwrap();

    let mut first = pipeline
        .invoke(Value::Null)
        .await
        .unwrap()
        .into_result()
        .unwrap();
    drain(first.readable().unwrap()).await.unwrap();

    let mut second = pipeline
        .invoke(Value::Null)
        .await
        .unwrap()
        .into_result()
        .unwrap();
    assert!(second.is_cache_hit());
    let bytes = drain(second.readable().unwrap()).await.unwrap();

    assert_eq!(bytes, b"computed once");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn no_content_sentinel_touches_no_step() {
    let calls = counter();
    let pipeline = PipelineBuilder::new()
        .open(
            Arc::new(EmitBytes {
                bytes: b"unreachable",
                calls: calls.clone(),
            }),
            None,
        )
        .init(init_fn(|request| {
            if request.is_null() {
                Ok(None)
            } else {
                Ok(Some(Vars::new()))
            }
        }))
        .done()
        .unwrap();

    let invocation = pipeline.invoke(Value::Null).await.unwrap();
    assert!(invocation.is_no_content());
    assert!(invocation.into_result().is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn initializer_error_propagates_to_the_caller() {
    let pipeline = PipelineBuilder::new()
        .open(
            Arc::new(EmitBytes {
                bytes: b"",
                calls: counter(),
            }),
            None,
        )
        .init(init_fn(|_request| Err("bad request".into())))
        .done()
        .unwrap();

    let err = pipeline.invoke(Value::Null).await.unwrap_err();
    assert!(matches!(err, PipelineError::Init(_)));
}

#[tokio::test]
async fn failing_step_surfaces_on_the_stream_and_leaves_no_cache_file() {
    let dir = TempDir::new().unwrap();

    let pipeline = PipelineBuilder::new()
        .open(Arc::new(FailAfter { prefix: b"partial " }), Some("broken.txt"))
        .config(PipelineConfig::with_cache_root(dir.path()))
        .done()
        .unwrap();

    let mut result = pipeline
        .invoke(Value::Null)
        .await
        .unwrap()
        .into_result()
        .unwrap();
    let err = drain(result.readable().unwrap()).await.unwrap_err();
    assert!(err.to_string().contains("deliberate failure"));

    // Neither the final path nor the partial survives a failed step.
    assert!(!dir.path().join("broken.txt").exists());
    assert!(!dir.path().join("broken.txt.partial").exists());
}

#[tokio::test]
async fn chain_without_caching_is_a_pure_passthrough() {
    let dir = TempDir::new().unwrap();

    let pipeline = PipelineBuilder::new()
        .open(
            Arc::new(EmitBytes {
                bytes: b"plain",
                calls: counter(),
            }),
            None,
        )
        .step(Arc::new(Uppercase { calls: counter() }), None)
        .config(PipelineConfig::with_cache_root(dir.path()))
        .done()
        .unwrap();

    let mut result = pipeline
        .invoke(Value::Null)
        .await
        .unwrap()
        .into_result()
        .unwrap();
    let bytes = drain(result.readable().unwrap()).await.unwrap();

    assert_eq!(bytes, b"PLAIN");
    // No disk I/O happened.
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn readable_yields_its_stream_exactly_once() {
    let pipeline = PipelineBuilder::new()
        .open(
            Arc::new(EmitBytes {
                bytes: b"x",
                calls: counter(),
            }),
            None,
        )
        .done()
        .unwrap();

    let mut result = pipeline
        .invoke(Value::Null)
        .await
        .unwrap()
        .into_result()
        .unwrap();

    let _stream = result.readable().unwrap();
    let err = result.readable().unwrap_err();
    assert!(err.is_no_result());
}

#[tokio::test]
async fn post_function_sees_vars_and_result() {
    let seen = Arc::new(AtomicBool::new(false));
    let seen_in_post = seen.clone();

    let pipeline = PipelineBuilder::new()
        .open(
            Arc::new(EmitBytes {
                bytes: b"x",
                calls: counter(),
            }),
            None,
        )
        .done_with(Arc::new(move |vars, result| {
            assert_eq!(vars.get_str("who"), Some("post"));
            seen_in_post.store(true, Ordering::SeqCst);
            result
        }))
        .unwrap();

    pipeline.invoke(json!({"who": "post"})).await.unwrap();
    assert!(seen.load(Ordering::SeqCst));
}

#[tokio::test]
async fn vars_reach_every_step() {
    struct EchoVar;

    #[async_trait]
    impl StepFn for EchoVar {
        async fn run(
            &self,
            vars: Arc<Vars>,
            output: &mut dyn ByteSink,
            _input: Option<ByteStream>,
        ) -> Result<(), BoxError> {
            let value = vars.get_str("greeting").unwrap_or("missing").to_string();
            output.write(Bytes::from(value)).await?;
            Ok(())
        }
    }

    let pipeline = PipelineBuilder::new()
        .open(Arc::new(EchoVar), None)
        .done()
        .unwrap();

    let mut result = pipeline
        .invoke(json!({"greeting": "hello vars"}))
        .await
        .unwrap()
        .into_result()
        .unwrap();
    let bytes = drain(result.readable().unwrap()).await.unwrap();
    assert_eq!(bytes, b"hello vars");
}

#[tokio::test]
async fn unresolved_cache_template_fails_the_invocation() {
    let pipeline = PipelineBuilder::new()
        .open(
            Arc::new(EmitBytes {
                bytes: b"x",
                calls: counter(),
            }),
            Some("{undefined}.txt"),
        )
        .done()
        .unwrap();

    let err = pipeline.invoke(Value::Null).await.unwrap_err();
    assert!(matches!(err, PipelineError::Template(_)));
}

#[tokio::test]
async fn transformer_step_with_hooks_runs_inside_the_pipeline() {
    use millrace_core::{Emit, Payload};
    use millrace_hooks::{hook_fn, HookRegistry, Stage};
    use millrace_transform::{op_fn, transform_json_lines, TransformOptions};

    /// JSON-lines transform step: annotates each record, with a post-hook
    /// stamping the invocation's channel onto every payload.
    struct Annotate {
        registry: Arc<HookRegistry>,
    }

    #[async_trait]
    impl StepFn for Annotate {
        async fn run(
            &self,
            vars: Arc<Vars>,
            output: &mut dyn ByteSink,
            input: Option<ByteStream>,
        ) -> Result<(), BoxError> {
            let input = input.expect("annotate step needs an upstream");
            let op = op_fn(|payload, _vars| {
                let Payload::Json(v) = payload else {
                    unreachable!("json-lines input is always a JSON payload")
                };
                Ok(Emit::json(json!({"name": v["name"], "seen": true})))
            });
            transform_json_lines(
                input,
                output,
                op.as_ref(),
                &self.registry,
                "reports",
                "annotate",
                &vars,
                TransformOptions::default(),
            )
            .await?;
            Ok(())
        }
    }

    let mut registry = HookRegistry::new();
    registry.register(
        "reports",
        Stage::Post,
        "annotate",
        hook_fn(|payload, vars| match payload {
            Payload::Json(mut v) => {
                v["channel"] = json!(vars.get_str("channel").unwrap_or("default"));
                Ok(Payload::Json(v))
            }
            other => Ok(other),
        }),
    );

    let dir = TempDir::new().unwrap();
    let pipeline = PipelineBuilder::new()
        .open(
            Arc::new(EmitBytes {
                bytes: b"{\"name\":\"a\"}\n\n{\"name\":\"b\"}\n",
                calls: counter(),
            }),
            None,
        )
        .step(
            Arc::new(Annotate {
                registry: Arc::new(registry),
            }),
            Some("annotated/{channel}.jsonl"),
        )
        .config(PipelineConfig::with_cache_root(dir.path()))
        .done()
        .unwrap();

    let mut result = pipeline
        .invoke(json!({"channel": "beta"}))
        .await
        .unwrap()
        .into_result()
        .unwrap();
    let bytes = drain(result.readable().unwrap()).await.unwrap();

    // serde_json orders object keys alphabetically.
    let expected = "{\"channel\":\"beta\",\"name\":\"a\",\"seen\":true}\n\
                    {\"channel\":\"beta\",\"name\":\"b\",\"seen\":true}\n";
    assert_eq!(std::str::from_utf8(&bytes).unwrap(), expected);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("annotated/beta.jsonl")).unwrap(),
        expected
    );
}

#[tokio::test]
async fn three_step_chain_caches_each_configured_step() {
    let dir = TempDir::new().unwrap();

    let pipeline = PipelineBuilder::new()
        .open(
            Arc::new(EmitBytes {
                bytes: b"abc",
                calls: counter(),
            }),
            Some("raw.txt"),
        )
        .step(Arc::new(Uppercase { calls: counter() }), None)
        .step(Arc::new(Uppercase { calls: counter() }), Some("final.txt"))
        .config(PipelineConfig::with_cache_root(dir.path()))
        .done()
        .unwrap();

    let mut result = pipeline
        .invoke(Value::Null)
        .await
        .unwrap()
        .into_result()
        .unwrap();
    let bytes = drain(result.readable().unwrap()).await.unwrap();

    assert_eq!(bytes, b"ABC");
    assert_eq!(std::fs::read(dir.path().join("raw.txt")).unwrap(), b"abc");
    assert_eq!(std::fs::read(dir.path().join("final.txt")).unwrap(), b"ABC");
    // The middle step configured no cache and wrote none.
    assert!(!dir.path().join("raw.txt.partial").exists());
}
