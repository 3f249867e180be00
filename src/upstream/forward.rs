//! Request forwarding with ordered fallback.
//!
//! # Responsibilities
//! - Rebuild the inbound request against an upstream base URL
//! - Enforce one deadline per attempt (timeouts count as failures)
//! - Walk an ordered candidate list, one attempt each, first success wins
//!
//! # Design Decisions
//! - A candidate fails on connect error, timeout, or non-2xx status
//! - No backoff, no retry of the same candidate, no circuit breaker
//! - GET/HEAD never carry a body upstream

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request, Response, StatusCode},
};
use bytes::Bytes;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::Value;
use thiserror::Error;
use tokio::time;

use crate::observability::metrics;
use crate::upstream::pool::Upstream;

/// Upper bound on how much of an upstream error body is kept for the client.
const ERROR_BODY_LIMIT: usize = 16 * 1024;

pub type HttpClient = Client<HttpConnector, Body>;

/// Pooled client shared by every request and configuration generation.
pub fn build_client(connect_timeout: Duration) -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    Client::builder(TokioExecutor::new()).build(connector)
}

/// Failure of a single upstream attempt.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream request: {0}")]
    InvalidRequest(String),

    #[error("upstream connection failed: {0}")]
    Network(String),

    #[error("upstream timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("upstream {upstream} responded with {status}")]
    Status {
        status: StatusCode,
        upstream: String,
        body: Option<String>,
    },
}

/// Every candidate failed (or there were none).
#[derive(Debug, Error)]
#[error("all {attempts} upstream attempts failed")]
pub struct FallbackError {
    pub attempts: usize,
    pub last: Option<ForwardError>,
}

/// A successful attempt.
pub struct Forwarded {
    pub upstream: Arc<Upstream>,
    pub response: Response<Incoming>,
    /// Attempts made, including the successful one.
    pub attempts: usize,
}

/// Replayable description of the call to make upstream.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl OutboundRequest {
    pub fn new(
        method: Method,
        path_and_query: impl Into<String>,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Self {
        let body = if carries_body(&method) { body } else { None };
        Self {
            method,
            path_and_query: path_and_query.into(),
            headers,
            body,
        }
    }

    /// Replace the body with a re-serialized JSON document.
    pub fn with_json(mut self, value: &Value) -> Self {
        if carries_body(&self.method) {
            self.headers
                .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
            self.body = Some(Bytes::from(value.to_string()));
        }
        self
    }

    fn build(&self, upstream: &Upstream) -> Result<Request<Body>, ForwardError> {
        let uri = upstream
            .target_uri(&self.path_and_query)
            .map_err(|e| ForwardError::InvalidRequest(e.to_string()))?;

        let mut builder = Request::builder().method(self.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in self.headers.iter() {
                headers.append(name.clone(), value.clone());
            }
        }

        let body = match &self.body {
            Some(bytes) => Body::from(bytes.clone()),
            None => Body::empty(),
        };
        builder
            .body(body)
            .map_err(|e| ForwardError::InvalidRequest(e.to_string()))
    }
}

fn carries_body(method: &Method) -> bool {
    *method != Method::GET && *method != Method::HEAD
}

/// Issues upstream calls under a uniform per-attempt deadline.
#[derive(Clone)]
pub struct Forwarder {
    client: HttpClient,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(client: HttpClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// One attempt against one upstream. Non-2xx is an error.
    pub async fn forward(
        &self,
        request: &OutboundRequest,
        upstream: &Upstream,
    ) -> Result<Response<Incoming>, ForwardError> {
        let outbound = request.build(upstream)?;

        let response = match time::timeout(self.timeout, self.client.request(outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(ForwardError::Network(describe(&e))),
            Err(_) => return Err(ForwardError::Timeout(self.timeout)),
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = self.read_error_body(response).await;
        Err(ForwardError::Status {
            status,
            upstream: upstream.name.clone(),
            body,
        })
    }

    /// Try each candidate in order; the first success wins.
    pub async fn forward_with_fallback(
        &self,
        request: &OutboundRequest,
        candidates: &[Arc<Upstream>],
    ) -> Result<Forwarded, FallbackError> {
        let mut last = None;

        for (index, upstream) in candidates.iter().enumerate() {
            let attempt = index + 1;
            let start = Instant::now();

            match self.forward(request, upstream).await {
                Ok(response) => {
                    metrics::record_upstream_attempt(&upstream.name, "success", start);
                    tracing::debug!(
                        upstream = %upstream.name,
                        group = %upstream.group,
                        attempt,
                        status = %response.status(),
                        "Upstream answered"
                    );
                    return Ok(Forwarded {
                        upstream: upstream.clone(),
                        response,
                        attempts: attempt,
                    });
                }
                Err(e) => {
                    let outcome = match &e {
                        ForwardError::Timeout(_) => "timeout",
                        ForwardError::Status { .. } => "status",
                        _ => "error",
                    };
                    metrics::record_upstream_attempt(&upstream.name, outcome, start);
                    tracing::warn!(
                        upstream = %upstream.name,
                        group = %upstream.group,
                        attempt,
                        remaining = candidates.len() - attempt,
                        error = %e,
                        "Upstream attempt failed"
                    );
                    last = Some(e);
                }
            }
        }

        Err(FallbackError {
            attempts: candidates.len(),
            last,
        })
    }

    async fn read_error_body(&self, response: Response<Incoming>) -> Option<String> {
        let body = Body::new(response.into_body());
        match time::timeout(self.timeout, axum::body::to_bytes(body, ERROR_BODY_LIMIT)).await {
            Ok(Ok(bytes)) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            _ => None,
        }
    }
}

/// The legacy client's Display hides the interesting part in `source()`.
fn describe(err: &hyper_util::client::legacy::Error) -> String {
    match std::error::Error::source(err) {
        Some(source) => format!("{}: {}", err, source),
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_head_drop_body() {
        let get = OutboundRequest::new(
            Method::GET,
            "/api/health",
            HeaderMap::new(),
            Some(Bytes::from_static(b"ignored")),
        );
        assert!(get.body.is_none());

        let head = OutboundRequest::new(Method::HEAD, "/", HeaderMap::new(), None)
            .with_json(&serde_json::json!({"a": 1}));
        assert!(head.body.is_none());
        assert!(head.headers.get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_with_json_replaces_body_and_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let request = OutboundRequest::new(
            Method::POST,
            "/api/v1/contact",
            headers,
            Some(Bytes::from_static(b"raw")),
        )
        .with_json(&serde_json::json!({"name": "Ada"}));

        assert_eq!(request.headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(request.body.unwrap(), Bytes::from_static(br#"{"name":"Ada"}"#));
    }

    #[test]
    fn test_build_targets_upstream() {
        let upstream = Upstream::new("a", "api", "http://127.0.0.1:9").unwrap();
        let request = OutboundRequest::new(Method::DELETE, "/api/x?y=1", HeaderMap::new(), None);
        let built = request.build(&upstream).unwrap();
        assert_eq!(built.method(), Method::DELETE);
        assert_eq!(built.uri().to_string(), "http://127.0.0.1:9/api/x?y=1");
    }

    #[tokio::test]
    async fn test_empty_candidate_list_fails_without_attempts() {
        let forwarder = Forwarder::new(build_client(Duration::from_secs(1)), Duration::from_secs(1));
        let request = OutboundRequest::new(Method::GET, "/api/health", HeaderMap::new(), None);
        let err = forwarder.forward_with_fallback(&request, &[]).await.err().unwrap();
        assert_eq!(err.attempts, 0);
        assert!(err.last.is_none());
    }
}
