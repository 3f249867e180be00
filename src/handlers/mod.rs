//! Endpoint handlers.
//!
//! # Data Flow
//! ```text
//! Request (preflight already answered)
//!     → Router::match_request
//!         NonApi            → info.rs (informational JSON or static pass-through)
//!         NotFound          → 404 with available_endpoints
//!         MethodNotAllowed  → 405 with allowed_methods
//!         Api(route)        → buffer body → validate.rs → endpoint handler
//!     → forwarder (ordered fallback over the route's upstream group)
//!     → enrichment / offline fallback / side channel
//! ```
//!
//! # Design Decisions
//! - Bodies are buffered (bounded by `security.max_body_size`) so they can
//!   be replayed for every candidate
//! - Pass-through responses stream; enriched responses are buffered once

pub mod access;
pub mod auth;
pub mod contact;
pub mod health;
pub mod info;
pub mod snapshots;
pub mod validate;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::{json, Map, Value};
use tokio::time;

use crate::error::{ProxyError, ProxyResult};
use crate::http::response::{from_upstream, into_object, timestamp};
use crate::http::server::InnerState;
use crate::observability::metrics;
use crate::routing::{Handler, Route, RouteMatch};
use crate::security::headers::outbound_headers;
use crate::upstream::{Forwarded, OutboundRequest, Upstream};

/// Key under which edge metadata is added to enriched bodies.
pub const EDGE_METADATA_KEY: &str = "edge_proxy";

/// A buffered inbound API request.
#[derive(Debug, Clone)]
pub struct ApiCall {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub client_addr: Option<SocketAddr>,
}

impl ApiCall {
    /// Buffer the request body up to `limit` bytes.
    pub async fn read(request: Request, limit: usize) -> ProxyResult<Self> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, limit)
            .await
            .map_err(|_| ProxyError::PayloadTooLarge(limit))?;

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        Ok(Self {
            method: parts.method,
            path_and_query,
            headers: parts.headers,
            body,
            client_addr: parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0),
        })
    }

    /// The body as a JSON object.
    pub fn json_body(&self) -> ProxyResult<Map<String, Value>> {
        if self.body.is_empty() {
            return Err(ProxyError::InvalidJson("empty body".to_string()));
        }
        match serde_json::from_slice::<Value>(&self.body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ProxyError::InvalidJson("expected a JSON object".to_string())),
            Err(e) => Err(ProxyError::InvalidJson(e.to_string())),
        }
    }

    /// The request as received, ready for the upstream.
    pub fn outbound(&self) -> OutboundRequest {
        let body = if self.body.is_empty() {
            None
        } else {
            Some(self.body.clone())
        };
        OutboundRequest::new(
            self.method.clone(),
            self.path_and_query.clone(),
            outbound_headers(&self.headers, self.client_addr),
            body,
        )
    }

    /// The request with a re-serialized JSON body.
    pub fn outbound_json(&self, body: &Map<String, Value>) -> OutboundRequest {
        self.outbound().with_json(&Value::Object(body.clone()))
    }
}

/// An upstream answer read into a JSON object for enrichment.
#[derive(Debug)]
pub struct UpstreamJson {
    pub status: StatusCode,
    pub upstream: String,
    pub body: Map<String, Value>,
}

/// Classify and handle one request. Returns a metrics label and the response.
pub async fn route(state: &InnerState, request: Request) -> (String, Response) {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match state.router.match_request(&method, &path) {
        RouteMatch::NonApi => {
            let response = info::non_api(state, request)
                .await
                .unwrap_or_else(IntoResponse::into_response);
            ("non_api".to_string(), response)
        }
        RouteMatch::NotFound => {
            tracing::debug!(method = %method, path = %path, "Unknown API endpoint");
            let err = ProxyError::NotFound {
                available: state.router.available_endpoints(),
            };
            ("not_found".to_string(), err.into_response())
        }
        RouteMatch::MethodNotAllowed { allowed } => {
            let err = ProxyError::MethodNotAllowed {
                method: method.to_string(),
                allowed,
            };
            ("method_not_allowed".to_string(), err.into_response())
        }
        RouteMatch::Api(route) => {
            let label = route.name.clone();
            let response = dispatch(state, route, request)
                .await
                .unwrap_or_else(|e| {
                    if e.status().is_server_error() {
                        tracing::warn!(route = %label, error = %e, "Request failed");
                    }
                    e.into_response()
                });
            (label, response)
        }
    }
}

async fn dispatch(state: &InnerState, route: &Route, request: Request) -> ProxyResult<Response> {
    let call = ApiCall::read(request, state.config.security.max_body_size).await?;
    let candidates = state.upstreams.candidates(&route.upstream_group);

    match route.handler {
        Handler::Health => Ok(health::handle(state, &call, candidates).await),
        Handler::Contact => contact::handle(state, &call, candidates).await,
        Handler::Login => auth::login(state, &call, candidates).await,
        Handler::RequestOtp => auth::request_otp(state, &call, candidates).await,
        Handler::VerifyOtp => auth::verify_otp(state, &call, candidates).await,
        Handler::RequestAccess => access::handle(state, &call, candidates).await,
        Handler::Snapshot(kind) => snapshots::handle(state, &call, candidates, kind).await,
        Handler::Info => Ok(info::handle(state)),
        Handler::Forward => passthrough(state, call.outbound(), candidates).await,
    }
}

/// Ordered fallback, converted to the handler error type.
pub async fn forward(
    state: &InnerState,
    request: &OutboundRequest,
    candidates: &[Arc<Upstream>],
) -> ProxyResult<Forwarded> {
    let forwarded = state
        .forwarder
        .forward_with_fallback(request, candidates)
        .await?;
    if forwarded.attempts > 1 {
        tracing::info!(
            upstream = %forwarded.upstream.name,
            attempts = forwarded.attempts,
            "Served by fallback upstream"
        );
    }
    Ok(forwarded)
}

/// Forward and stream the upstream response back unchanged.
pub async fn passthrough(
    state: &InnerState,
    request: OutboundRequest,
    candidates: &[Arc<Upstream>],
) -> ProxyResult<Response> {
    let forwarded = forward(state, &request, candidates).await?;
    Ok(from_upstream(forwarded.response, state.forwarder.timeout()))
}

/// Forward and read the upstream body as a JSON object.
pub async fn forward_json(
    state: &InnerState,
    request: OutboundRequest,
    candidates: &[Arc<Upstream>],
) -> ProxyResult<UpstreamJson> {
    let forwarded = forward(state, &request, candidates).await?;
    let status = forwarded.response.status();
    let body = Body::new(forwarded.response.into_body());
    let limit = state.config.security.max_body_size;

    let bytes = match time::timeout(state.forwarder.timeout(), axum::body::to_bytes(body, limit)).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            return Err(ProxyError::UpstreamFailed(format!(
                "failed to read upstream body: {}",
                e
            )))
        }
        Err(_) => {
            return Err(ProxyError::UpstreamFailed(
                "timed out reading upstream body".to_string(),
            ))
        }
    };

    Ok(UpstreamJson {
        status,
        upstream: forwarded.upstream.name.clone(),
        body: into_object(&bytes),
    })
}

/// Synthesized answer for an upstream failure, if the offline policy has one.
///
/// Caller errors and upstream 4xx answers never reach the policy.
pub fn offline_answer<T>(
    endpoint: &'static str,
    err: &ProxyError,
    answer: impl FnOnce() -> Option<T>,
) -> Option<T> {
    if !err.is_upstream_failure() {
        return None;
    }
    let value = answer()?;
    tracing::warn!(endpoint, error = %err, "Upstream failed, answering from offline policy");
    metrics::record_offline_fallback(endpoint);
    Some(value)
}

/// Metadata object stamped onto enriched responses.
pub fn edge_metadata(state: &InnerState, extra: Value) -> Value {
    let mut meta = json!({
        "processed": true,
        "service": state.config.service.name,
        "version": state.config.service.version,
        "timestamp": timestamp(),
    });
    if let (Some(meta), Value::Object(extra)) = (meta.as_object_mut(), extra) {
        meta.extend(extra);
    }
    meta
}
