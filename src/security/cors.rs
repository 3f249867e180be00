//! CORS normalization.
//!
//! Every response leaving the proxy carries the configured CORS header set,
//! overwriting whatever the upstream sent. `OPTIONS` requests are answered
//! here and never reach routing or an upstream.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::config::CorsConfig;
use crate::http::server::AppState;

const DEFAULT_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const DEFAULT_HEADERS: &str = "Content-Type, Authorization";

/// Compiled CORS header set.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    any_origin: bool,
    origins: Vec<HeaderValue>,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    max_age: HeaderValue,
    preflight_status: StatusCode,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Self {
        let any_origin = config.allow_origins.iter().any(|o| o == "*");
        let origins = config
            .allow_origins
            .iter()
            .filter(|o| o.as_str() != "*")
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();

        Self {
            any_origin,
            origins,
            allow_methods: joined(&config.allow_methods, DEFAULT_METHODS),
            allow_headers: joined(&config.allow_headers, DEFAULT_HEADERS),
            max_age: HeaderValue::from(config.max_age_secs),
            preflight_status: StatusCode::from_u16(config.preflight_status)
                .unwrap_or(StatusCode::NO_CONTENT),
        }
    }

    /// Empty-bodied answer to an `OPTIONS` request.
    pub fn preflight(&self, origin: Option<&HeaderValue>) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = self.preflight_status;
        let headers = response.headers_mut();
        self.apply(origin, headers);
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        response
    }

    /// Overwrite the CORS headers on an outgoing response.
    pub fn apply(&self, origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
        headers.remove(header::ACCESS_CONTROL_ALLOW_ORIGIN);
        headers.remove(header::ACCESS_CONTROL_ALLOW_CREDENTIALS);
        if let Some(value) = self.allowed_origin(origin) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
            if !self.any_origin {
                headers.append(header::VARY, HeaderValue::from_static("Origin"));
            }
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
    }

    fn allowed_origin(&self, origin: Option<&HeaderValue>) -> Option<HeaderValue> {
        if self.any_origin {
            return Some(HeaderValue::from_static("*"));
        }
        origin.filter(|o| self.origins.contains(o)).cloned()
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self::from_config(&CorsConfig::default())
    }
}

fn joined(values: &[String], fallback: &'static str) -> HeaderValue {
    HeaderValue::from_str(&values.join(", "))
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| HeaderValue::from_static(fallback))
}

/// Preflight short-circuit plus CORS stamping for every other response.
pub async fn cors_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let policy = state.inner.load().cors.clone();
    let origin = request.headers().get(header::ORIGIN).cloned();

    if request.method() == Method::OPTIONS {
        tracing::debug!(path = %request.uri().path(), "Answering preflight");
        return policy.preflight(origin.as_ref());
    }

    let mut response = next.run(request).await;
    policy.apply(origin.as_ref(), response.headers_mut());
    response
}
