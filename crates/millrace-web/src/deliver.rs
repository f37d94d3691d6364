//! Streaming delivery of step results.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures::{future, stream, StreamExt};
use millrace_pipeline::{Invocation, Pipeline, StepResult};
use serde_json::Value;
use std::convert::Infallible;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{error, warn};

/// Invoke `pipeline` and translate the whole outcome, engine errors
/// included, into a response.
pub async fn invoke_and_deliver(
    pipeline: &Pipeline,
    request: Value,
    headers: HeaderMap,
) -> Response {
    match pipeline.invoke(request).await {
        Ok(invocation) => respond(invocation, headers).await,
        Err(e) if e.is_no_result() => empty(StatusCode::NO_CONTENT, &headers),
        Err(e) => {
            error!(error = %e, "pipeline invocation failed");
            empty(StatusCode::INTERNAL_SERVER_ERROR, &headers)
        }
    }
}

/// Deliver an invocation outcome: the no-content sentinel becomes an
/// explicit empty response.
pub async fn respond(invocation: Invocation, headers: HeaderMap) -> Response {
    match invocation {
        Invocation::NoContent => empty(StatusCode::NO_CONTENT, &headers),
        Invocation::Ready(result) => deliver(result, headers).await,
    }
}

/// Stream a step result's bytes to the client.
///
/// The status is decided by the first read, not before it, so an empty or
/// unreadable result still gets an accurate status line.
pub async fn deliver(mut result: StepResult, headers: HeaderMap) -> Response {
    let content_type = content_type_for(result.cache_path());

    let mut body_stream = match result.readable() {
        Ok(stream) => stream,
        // Already consumed: a normal-but-empty outcome.
        Err(_) => return empty(StatusCode::NO_CONTENT, &headers),
    };

    // The first non-empty chunk commits the status line.
    let first = loop {
        match body_stream.next().await {
            None => return empty(StatusCode::NO_CONTENT, &headers),
            Some(Ok(chunk)) if chunk.is_empty() => continue,
            Some(Ok(chunk)) => break chunk,
            Some(Err(e)) => {
                let status = if e.kind() == ErrorKind::NotFound {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                warn!(error = %e, %status, "result unreadable before any bytes were sent");
                return empty(status, &headers);
            }
        }
    };

    // From here on the status is committed; a later read error can only end
    // the stream.
    let tail = body_stream.scan((), |_, item| {
        future::ready(match item {
            Ok(chunk) => Some(chunk),
            Err(e) => {
                warn!(error = %e, "result stream failed mid-response, terminating body");
                None
            }
        })
    });
    let chunks = stream::iter([first]).chain(tail).map(Ok::<Bytes, Infallible>);

    let mut response = Response::new(Body::from_stream(chunks));
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    merge_headers(&mut response, &headers);
    response
}

fn content_type_for(path: Option<&Path>) -> HeaderValue {
    let mime = match path {
        Some(path) => mime_guess::from_path(path).first_or_octet_stream(),
        None => mime_guess::mime::APPLICATION_OCTET_STREAM,
    };
    HeaderValue::from_str(mime.essence_str())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

fn empty(status: StatusCode, headers: &HeaderMap) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    merge_headers(&mut response, headers);
    response
}

fn merge_headers(response: &mut Response, headers: &HeaderMap) {
    for (name, value) in headers {
        response.headers_mut().insert(name, value.clone());
    }
}
