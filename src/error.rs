//! Error taxonomy for the proxy pipeline.
//!
//! Every variant renders as a JSON body carrying a `timestamp`; nothing
//! reaches the client as an empty or non-JSON error.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::http::response::{json_response, timestamp};
use crate::upstream::forward::{FallbackError, ForwardError};

/// Errors surfaced by request handling.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Body was not valid JSON (or not a JSON object).
    #[error("Invalid JSON in request body")]
    InvalidJson(String),

    /// Required payload fields were absent or blank.
    #[error("Missing required fields: {}", .missing.join(", "))]
    MissingFields {
        missing: Vec<&'static str>,
        required: &'static [&'static str],
    },

    /// Payload is well-formed but unusable.
    #[error("{0}")]
    BadRequest(String),

    /// Body exceeded the configured limit or could not be read.
    #[error("Request body too large or unreadable (limit {0} bytes)")]
    PayloadTooLarge(usize),

    /// Path under the API prefix with no registered handler.
    #[error("Endpoint not found")]
    NotFound { available: Vec<String> },

    /// Path is registered, method is not.
    #[error("Method {method} not allowed")]
    MethodNotAllowed { method: String, allowed: Vec<String> },

    /// Upstream answered with a non-success status.
    #[error("Upstream {upstream} responded with {status}")]
    UpstreamStatus {
        status: StatusCode,
        upstream: String,
        body: Option<String>,
    },

    /// Upstream could not be reached or timed out.
    #[error("Upstream request failed: {0}")]
    UpstreamFailed(String),

    /// Every candidate upstream failed.
    #[error("All backend services unavailable")]
    UpstreamUnavailable { attempts: usize },

    /// Anything unexpected.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for request handling.
pub type ProxyResult<T> = Result<T, ProxyError>;

impl ProxyError {
    /// True when the failure lies with the upstream rather than the caller.
    ///
    /// Offline fallbacks only ever replace this class of failure; an
    /// upstream 4xx is a real answer and is relayed as-is.
    pub fn is_upstream_failure(&self) -> bool {
        match self {
            ProxyError::UpstreamStatus { status, .. } => status.is_server_error(),
            ProxyError::UpstreamFailed(_) | ProxyError::UpstreamUnavailable { .. } => true,
            _ => false,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidJson(_)
            | ProxyError::MissingFields { .. }
            | ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::NotFound { .. } => StatusCode::NOT_FOUND,
            ProxyError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::UpstreamStatus { status, .. } => *status,
            ProxyError::UpstreamFailed(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ProxyError::InvalidJson(detail) => json!({
                "status": "error",
                "message": "Invalid JSON in request body",
                "error": detail,
                "timestamp": timestamp(),
            }),
            ProxyError::MissingFields { missing, required } => json!({
                "status": "error",
                "message": self.to_string(),
                "missing_fields": missing,
                "required_fields": required,
                "timestamp": timestamp(),
            }),
            ProxyError::BadRequest(message) => json!({
                "status": "error",
                "message": message,
                "timestamp": timestamp(),
            }),
            ProxyError::PayloadTooLarge(_) => json!({
                "status": "error",
                "message": self.to_string(),
                "timestamp": timestamp(),
            }),
            ProxyError::NotFound { available } => json!({
                "status": "error",
                "error": "Endpoint not found",
                "message": "Endpoint not found",
                "available_endpoints": available,
                "timestamp": timestamp(),
            }),
            ProxyError::MethodNotAllowed { allowed, .. } => json!({
                "status": "error",
                "message": self.to_string(),
                "allowed_methods": allowed,
                "timestamp": timestamp(),
            }),
            ProxyError::UpstreamStatus { status, upstream, body } => {
                let mut value = json!({
                    "error": "Backend service error",
                    "status": status.as_u16(),
                    "message": status.canonical_reason().unwrap_or("Upstream error"),
                    "upstream": upstream,
                    "timestamp": timestamp(),
                });
                if let Some(text) = body.as_deref().filter(|t| !t.is_empty()) {
                    value["backend_response"] = json!(text);
                }
                value
            }
            ProxyError::UpstreamFailed(message) => json!({
                "error": "Proxy service error",
                "status": status.as_u16(),
                "message": message,
                "timestamp": timestamp(),
            }),
            ProxyError::UpstreamUnavailable { attempts } => json!({
                "error": "All backend services unavailable",
                "status": status.as_u16(),
                "message": "Please try again later",
                "attempts": attempts,
                "timestamp": timestamp(),
            }),
            // Details stay in the logs.
            ProxyError::Internal(_) => json!({
                "status": "error",
                "error": "Internal error",
                "message": "Edge proxy internal error",
                "timestamp": timestamp(),
            }),
        };

        let mut response = json_response(status, body);
        if let ProxyError::MethodNotAllowed { allowed, .. } = &self {
            if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }
        response
    }
}

impl From<ForwardError> for ProxyError {
    fn from(err: ForwardError) -> Self {
        match err {
            ForwardError::Status { status, upstream, body } => {
                ProxyError::UpstreamStatus { status, upstream, body }
            }
            other => ProxyError::UpstreamFailed(other.to_string()),
        }
    }
}

impl From<FallbackError> for ProxyError {
    /// A lone candidate keeps its own failure; a list that ran dry is a 503.
    fn from(err: FallbackError) -> Self {
        match (err.attempts, err.last) {
            (1, Some(last)) => last.into(),
            (attempts, _) => ProxyError::UpstreamUnavailable { attempts },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_fields_body_lists_exactly_missing() {
        let err = ProxyError::MissingFields {
            missing: vec!["email", "message"],
            required: &["name", "email", "message"],
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["missing_fields"], json!(["email", "message"]));
        assert_eq!(body["message"], "Missing required fields: email, message");
    }

    #[tokio::test]
    async fn test_not_found_lists_endpoints() {
        let err = ProxyError::NotFound {
            available: vec!["GET /api/health".into()],
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = body_json(response).await;
        assert_eq!(body["available_endpoints"], json!(["GET /api/health"]));
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = ProxyError::Internal("secret detail".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(!body.to_string().contains("secret detail"));
        assert!(body["timestamp"].is_string());
    }

    #[test]
    fn test_single_candidate_failure_keeps_upstream_status() {
        let err: ProxyError = FallbackError {
            attempts: 1,
            last: Some(ForwardError::Status {
                status: StatusCode::UNAUTHORIZED,
                upstream: "primary".into(),
                body: None,
            }),
        }
        .into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert!(!err.is_upstream_failure());
    }

    #[test]
    fn test_single_candidate_network_failure_is_bad_gateway() {
        let err: ProxyError = FallbackError {
            attempts: 1,
            last: Some(ForwardError::Timeout(Duration::from_secs(5))),
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.is_upstream_failure());
    }

    #[test]
    fn test_exhausted_candidates_is_service_unavailable() {
        let err: ProxyError = FallbackError {
            attempts: 2,
            last: Some(ForwardError::Network("refused".into())),
        }
        .into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let none: ProxyError = FallbackError { attempts: 0, last: None }.into();
        assert_eq!(none.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
