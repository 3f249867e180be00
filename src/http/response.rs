//! Response construction and transformation.
//!
//! # Responsibilities
//! - Build JSON responses for everything the edge generates itself
//! - Convert upstream responses for the client (streaming, hop-by-hop stripped)
//! - Produce consistent timestamps for response bodies
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - CORS headers are applied later by the CORS middleware, never here

use std::time::Duration;

use axum::{
    body::Body,
    http::{Response as HttpResponse, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use hyper::body::Incoming;
use serde_json::{Map, Value};
use tower_http::timeout::TimeoutBody;

use crate::security::headers::strip_hop_by_hop;

/// Build a JSON response with the given status.
pub fn json_response(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

/// Build a JSON response from an object map.
pub fn json_object_response(status: StatusCode, body: Map<String, Value>) -> Response {
    json_response(status, Value::Object(body))
}

/// Current time as RFC 3339 with millisecond precision (UTC).
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Milliseconds since the Unix epoch, used for generated identifiers.
pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Hand an upstream response to the client without buffering the body.
///
/// Each body read must complete within `read_timeout`; a stalled upstream
/// aborts the stream instead of holding the client connection.
pub fn from_upstream(response: HttpResponse<Incoming>, read_timeout: Duration) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(TimeoutBody::new(read_timeout, body)))
}

/// Interpret an upstream body as a JSON object.
///
/// Non-object JSON is wrapped as `{"data": ...}`, anything else as
/// `{"message": "<text>"}` so enrichment always has an object to extend.
pub fn into_object(bytes: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            let mut map = Map::new();
            map.insert("data".into(), other);
            map
        }
        Err(_) => {
            let mut map = Map::new();
            let text = String::from_utf8_lossy(bytes).trim().to_string();
            if !text.is_empty() {
                map.insert("message".into(), Value::String(text));
            }
            map
        }
    }
}
