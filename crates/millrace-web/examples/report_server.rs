//! Minimal report server: one cached pipeline behind one route.
//!
//! ```text
//! cargo run -p millrace-web --example report_server
//! curl http://127.0.0.1:3000/reports/q3
//! ```
//!
//! The first request for a slug computes the report and tees it to the
//! cache directory; repeats are served from disk without running the step.

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use millrace_core::{BoxError, ByteSink, ByteStream, PipelineConfig, Vars};
use millrace_pipeline::{Pipeline, PipelineBuilder, StepFn};
use millrace_web::invoke_and_deliver;
use serde_json::json;
use std::sync::Arc;

/// Stands in for an expensive report computation.
struct BuildReport;

#[async_trait]
impl StepFn for BuildReport {
    async fn run(
        &self,
        vars: Arc<Vars>,
        output: &mut dyn ByteSink,
        _input: Option<ByteStream>,
    ) -> Result<(), BoxError> {
        let slug = vars.get_str("slug").unwrap_or("unknown");
        for section in ["summary", "details", "appendix"] {
            let line = serde_json::to_string(&json!({"report": slug, "section": section}))?;
            output.write(Bytes::from(line + "\n")).await?;
        }
        Ok(())
    }
}

async fn report(State(pipeline): State<Arc<Pipeline>>, Path(slug): Path<String>) -> Response {
    invoke_and_deliver(&pipeline, json!({"slug": slug}), HeaderMap::new()).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cache_dir = std::env::temp_dir().join("millrace-reports");
    let pipeline = PipelineBuilder::new()
        .open(Arc::new(BuildReport), Some("reports/{slug}.jsonl"))
        .config(PipelineConfig::with_cache_root(&cache_dir))
        .done()?;

    let app = Router::new()
        .route("/reports/{slug}", get(report))
        .with_state(Arc::new(pipeline));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!(cache = %cache_dir.display(), "serving reports on http://127.0.0.1:3000");
    axum::serve(listener, app).await?;
    Ok(())
}
