//! Endpoint table and request classification.
//!
//! # Responsibilities
//! - Register every API endpoint as `(pattern, methods) → Handler`
//! - Classify a request as API hit, wrong method, unknown, or non-API
//! - Serve as the single source for endpoint listings
//!
//! # Design Decisions
//! - Immutable after construction; rebuilt on config reload
//! - Built-in endpoints are checked before configured routes
//! - Configured routes are ordered by priority (higher first), then by
//!   declaration order

use axum::http::Method;

use crate::config::{RouteConfig, ServiceConfig};
use crate::routing::matcher::{prefix_matches, PathPattern};

/// Read-only snapshot endpoints that may be synthesized while offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snapshot {
    Status,
    Metrics,
    Clusters,
}

impl Snapshot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Snapshot::Status => "status",
            Snapshot::Metrics => "metrics",
            Snapshot::Clusters => "clusters",
        }
    }
}

/// What a matched route does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Health,
    Contact,
    Login,
    RequestAccess,
    RequestOtp,
    VerifyOtp,
    Snapshot(Snapshot),
    Info,
    /// Plain pass-through to the route's upstream group.
    Forward,
}

/// A registered endpoint.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub pattern: PathPattern,
    /// Allowed methods; empty means any.
    pub methods: Vec<Method>,
    pub handler: Handler,
    pub upstream_group: String,
}

impl Route {
    fn allows(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    fn method_label(&self) -> String {
        if self.methods.is_empty() {
            "ANY".to_string()
        } else {
            self.methods
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(",")
        }
    }

    /// `"POST /api/v1/contact"`.
    pub fn describe(&self) -> String {
        format!("{} {}", self.method_label(), self.pattern)
    }
}

/// Result of classifying a request.
#[derive(Debug)]
pub enum RouteMatch<'a> {
    Api(&'a Route),
    MethodNotAllowed { allowed: Vec<String> },
    NotFound,
    NonApi,
}

/// The compiled endpoint table.
#[derive(Debug, Clone)]
pub struct Router {
    api_prefix: String,
    routes: Vec<Route>,
}

impl Router {
    pub fn from_config(service: &ServiceConfig, configured: &[RouteConfig]) -> Self {
        let prefix = service.api_prefix.trim_end_matches('/').to_string();
        let group = service.default_group.clone();

        let builtin = |name: &str, path: &str, method: Method, handler: Handler| Route {
            name: name.to_string(),
            pattern: PathPattern::exact(format!("{}{}", prefix, path)),
            methods: vec![method],
            handler,
            upstream_group: group.clone(),
        };

        let mut routes = vec![
            builtin("health", "/health", Method::GET, Handler::Health),
            builtin("contact", "/v1/contact", Method::POST, Handler::Contact),
            builtin("login", "/v1/auth/login", Method::POST, Handler::Login),
            builtin("request_access", "/v1/request-access", Method::POST, Handler::RequestAccess),
            builtin("request_otp", "/v1/admin/request-otp", Method::POST, Handler::RequestOtp),
            builtin("verify_otp", "/v1/admin/verify-otp", Method::POST, Handler::VerifyOtp),
            builtin("status", "/v1/status", Method::GET, Handler::Snapshot(Snapshot::Status)),
            builtin("metrics", "/v1/metrics", Method::GET, Handler::Snapshot(Snapshot::Metrics)),
            builtin("clusters", "/v1/clusters", Method::GET, Handler::Snapshot(Snapshot::Clusters)),
            builtin("info", "/v1/info", Method::GET, Handler::Info),
        ];

        let mut extra: Vec<&RouteConfig> = configured.iter().collect();
        // Stable sort keeps declaration order among equal priorities.
        extra.sort_by(|a, b| b.priority.cmp(&a.priority));

        for config in extra {
            let methods = config
                .methods
                .iter()
                .filter_map(|m| match Method::from_bytes(m.to_ascii_uppercase().as_bytes()) {
                    Ok(method) => Some(method),
                    Err(_) => {
                        tracing::warn!(route = %config.name, method = %m, "Ignoring invalid route method");
                        None
                    }
                })
                .collect();

            routes.push(Route {
                name: config.name.clone(),
                pattern: PathPattern::prefix(config.path_prefix.as_str()),
                methods,
                handler: Handler::Forward,
                upstream_group: config.upstream_group.clone(),
            });
        }

        Self {
            api_prefix: if prefix.is_empty() { "/".to_string() } else { prefix },
            routes,
        }
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn is_api_path(&self, path: &str) -> bool {
        prefix_matches(&self.api_prefix, path)
    }

    pub fn match_request(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        if !self.is_api_path(path) {
            return RouteMatch::NonApi;
        }

        let mut allowed: Vec<String> = Vec::new();
        for route in self.routes.iter().filter(|r| r.pattern.matches(path)) {
            if route.allows(method) {
                return RouteMatch::Api(route);
            }
            for m in &route.methods {
                if !allowed.iter().any(|a| a == m.as_str()) {
                    allowed.push(m.as_str().to_string());
                }
            }
        }

        if allowed.is_empty() {
            RouteMatch::NotFound
        } else {
            allowed.push(Method::OPTIONS.as_str().to_string());
            RouteMatch::MethodNotAllowed { allowed }
        }
    }

    /// Every registered endpoint, in match order.
    pub fn available_endpoints(&self) -> Vec<String> {
        self.routes.iter().map(Route::describe).collect()
    }
}
