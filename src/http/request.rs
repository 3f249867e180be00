//! Request identification and tracing spans.
//!
//! # Responsibilities
//! - Assign a UUID v4 `x-request-id` unless the client sent one
//! - Echo the id on the response
//! - Open one tracing span per request carrying the id
//!
//! # Design Decisions
//! - Request ID added as early as possible (outermost layer) so every log
//!   line of the request, and the upstream call, can be correlated

use axum::{extract::Request, http::HeaderName};
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tracing::Span;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID.clone(), MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID.clone())
}

/// The request id, from the extension set by `SetRequestIdLayer` or the header.
pub fn request_id(request: &Request) -> &str {
    request
        .extensions()
        .get::<RequestId>()
        .map(RequestId::header_value)
        .or_else(|| request.headers().get(&X_REQUEST_ID))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Span factory for `TraceLayer`.
pub fn make_span(request: &Request) -> Span {
    tracing::info_span!(
        "request",
        request_id = %request_id(request),
        method = %request.method(),
        path = %request.uri().path(),
    )
}
