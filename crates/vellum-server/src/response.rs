//! HTTP response building.
//!
//! Unary replies are one JSON object. Streamed replies are
//! `application/x-ndjson`: one wire message per line. A failure before the
//! first message becomes a regular error response with the error's status;
//! a failure mid-stream is written as a final envelope line and ends the
//! body.

use std::convert::Infallible;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Response, StatusCode};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::Frame;
use serde::Serialize;
use vellum_core::{RequestId, VellumError, VellumResult, WireMessage};
use vellum_pipeline::WireStream;
use vellum_schema::json;

/// Response body type.
pub type ResponseBody = UnsyncBoxBody<Bytes, Infallible>;

/// Response type.
pub type HttpResponse = Response<ResponseBody>;

/// Request id header, echoed on every RPC response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Caller identity header.
pub const CALLER_HEADER: &str = "x-caller-id";

const JSON: &str = "application/json";
const NDJSON: &str = "application/x-ndjson";

/// A complete body.
pub fn full(bytes: impl Into<Bytes>) -> ResponseBody {
    Full::new(bytes.into()).boxed_unsync()
}

fn build(
    status: StatusCode,
    content_type: &'static str,
    request_id: Option<&RequestId>,
    body: ResponseBody,
) -> HttpResponse {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Some(id) = request_id {
        if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
    }
    response
}

/// A JSON response.
pub fn json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
    request_id: Option<&RequestId>,
) -> HttpResponse {
    match serde_json::to_vec(body) {
        Ok(bytes) => build(status, JSON, request_id, full(bytes)),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode response body");
            error_response(
                &VellumError::internal("failed to encode response body"),
                request_id,
            )
        }
    }
}

/// An error envelope with the error's own status.
pub fn error_response(err: &VellumError, request_id: Option<&RequestId>) -> HttpResponse {
    error_with_status(err.status_code(), err, request_id)
}

/// An error envelope with an explicit status.
pub fn error_with_status(
    status: StatusCode,
    err: &VellumError,
    request_id: Option<&RequestId>,
) -> HttpResponse {
    let rid = request_id.map(ToString::to_string);
    let envelope = err.to_envelope(rid.as_deref());
    let body = serde_json::to_vec(&envelope).unwrap_or_else(|_| {
        br#"{"error":{"code":"internal","message":"internal error","category":"internal","retryable":false}}"#
            .to_vec()
    });
    build(status, JSON, request_id, full(body))
}

/// A plain-text response, used for the Prometheus exposition.
pub fn text_response(status: StatusCode, body: String) -> HttpResponse {
    build(status, "text/plain; version=0.0.4", None, full(body))
}

/// Streams `messages` as NDJSON.
///
/// Waits for the first item so that a call failing up front still gets a
/// proper status code.
pub async fn ndjson_response(mut messages: WireStream, request_id: RequestId) -> HttpResponse {
    let first = match messages.next().await {
        Some(Err(err)) => return error_response(&err, Some(&request_id)),
        first => first,
    };

    let rid = request_id.to_string();
    let lines = stream::iter(first)
        .chain(messages)
        .map(move |item| Ok::<_, Infallible>(Frame::data(ndjson_line(&item, &rid))));
    build(
        StatusCode::OK,
        NDJSON,
        Some(&request_id),
        StreamBody::new(lines).boxed_unsync(),
    )
}

fn ndjson_line(item: &VellumResult<WireMessage>, request_id: &str) -> Bytes {
    let encoded = match item {
        Ok(message) => serde_json::to_vec(&json::to_json(message)),
        Err(err) => {
            tracing::warn!(error = %err, "stream failed after first message");
            serde_json::to_vec(&err.to_envelope(Some(request_id)))
        }
    };
    let mut line = encoded.unwrap_or_else(|_| b"{}".to_vec());
    line.push(b'\n');
    Bytes::from(line)
}
