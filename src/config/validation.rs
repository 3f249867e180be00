//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes and static group reference upstream groups)
//! - Validate value ranges (timeouts > 0, header values encodable)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::{HeaderValue, Method};
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let prefix = &config.service.api_prefix;
    if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
        errors.push(ValidationError::new(
            "service.api_prefix",
            "must start with '/', be longer than '/' and have no trailing slash",
        ));
    }
    if config.service.default_group.is_empty() {
        errors.push(ValidationError::new("service.default_group", "must not be empty"));
    }

    let mut groups = HashSet::new();
    let mut names = HashSet::new();
    for (i, upstream) in config.upstreams.iter().enumerate() {
        let field = format!("upstreams[{}]", i);
        if !names.insert(upstream.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", field),
                format!("duplicate upstream name '{}'", upstream.name),
            ));
        }
        groups.insert(upstream.group.as_str());
        if let Err(message) = check_upstream_url(&upstream.base_url) {
            errors.push(ValidationError::new(format!("{}.base_url", field), message));
        }
    }

    if let Some(group) = &config.service.static_group {
        if !groups.contains(group.as_str()) {
            errors.push(ValidationError::new(
                "service.static_group",
                format!("no upstream belongs to group '{}'", group),
            ));
        }
    }

    let mut route_names = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{}]", i);
        if !route_names.insert(route.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", field),
                format!("duplicate route name '{}'", route.name),
            ));
        }
        if !route.path_prefix.starts_with(&format!("{}/", prefix)) {
            errors.push(ValidationError::new(
                format!("{}.path_prefix", field),
                format!("'{}' is not under the API prefix '{}'", route.path_prefix, prefix),
            ));
        }
        if !groups.contains(route.upstream_group.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.upstream_group", field),
                format!("no upstream belongs to group '{}'", route.upstream_group),
            ));
        }
        for method in &route.methods {
            if method.parse::<Method>().is_err() {
                errors.push(ValidationError::new(
                    format!("{}.methods", field),
                    format!("'{}' is not an HTTP method", method),
                ));
            }
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }

    let cors = &config.cors;
    if cors.allow_origins.is_empty() {
        errors.push(ValidationError::new("cors.allow_origins", "must list at least one origin"));
    }
    for (field, values) in [
        ("cors.allow_origins", &cors.allow_origins),
        ("cors.allow_methods", &cors.allow_methods),
        ("cors.allow_headers", &cors.allow_headers),
    ] {
        if HeaderValue::from_str(&values.join(", ")).is_err() {
            errors.push(ValidationError::new(field, "contains characters not allowed in a header"));
        }
    }
    if !matches!(cors.preflight_status, 200 | 204) {
        errors.push(ValidationError::new("cors.preflight_status", "must be 200 or 204"));
    }

    let email = &config.email;
    if email.enabled {
        match email.endpoint.as_deref().map(Url::parse) {
            Some(Ok(url)) if matches!(url.scheme(), "http" | "https") => {}
            Some(_) => errors.push(ValidationError::new("email.endpoint", "must be an http(s) URL")),
            None => errors.push(ValidationError::new("email.endpoint", "required when email is enabled")),
        }
        if email.to_address.as_deref().map_or(true, str::is_empty) {
            errors.push(ValidationError::new("email.to_address", "required when email is enabled"));
        }
    }

    let offline = &config.offline;
    if offline.enabled
        && offline.verify_otp
        && (offline.demo_admin_email.is_none() || offline.demo_otp.is_none())
    {
        errors.push(ValidationError::new(
            "offline.verify_otp",
            "requires demo_admin_email and demo_otp",
        ));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Upstreams are reached through a plain HTTP connector.
fn check_upstream_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("'{}' is not a URL: {}", raw, e))?;
    if url.scheme() != "http" {
        return Err(format!("'{}' must use the http scheme", raw));
    }
    if url.host_str().is_none() {
        return Err(format!("'{}' has no host", raw));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(format!("'{}' must not carry a query or fragment", raw));
    }
    Ok(())
}
