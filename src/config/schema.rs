//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Service identity and API layout.
    pub service: ServiceConfig,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream origins, tried in declaration order within a group.
    pub upstreams: Vec<UpstreamConfig>,

    /// Extra pass-through routes beyond the built-in endpoint table.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// CORS header set.
    pub cors: CorsConfig,

    /// Transactional email side channel for contact submissions.
    pub email: EmailConfig,

    /// Canned responses used while upstreams are offline.
    pub offline: OfflineConfig,

    /// Request limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Service identity and API layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Name reported in informational payloads.
    pub name: String,

    /// Version reported in edge metadata.
    pub version: String,

    /// Paths under this prefix are API calls; everything else is static.
    pub api_prefix: String,

    /// Upstream group used by the built-in endpoints.
    pub default_group: String,

    /// Upstream group serving non-API paths. When unset the proxy answers
    /// non-API paths with an informational JSON payload.
    pub static_group: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "edge-proxy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            api_prefix: "/api".to_string(),
            default_group: "api".to_string(),
            static_group: None,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A single upstream origin.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Identifier for logging/metrics.
    pub name: String,

    /// Logical backend this origin serves.
    #[serde(default = "default_group")]
    pub group: String,

    /// Base URL, e.g. "http://10.0.0.5:8080". Path and query of the inbound
    /// request are appended verbatim.
    pub base_url: String,
}

fn default_group() -> String {
    "api".to_string()
}

/// Extra route forwarded as-is to an upstream group.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix to match (must sit under the API prefix).
    pub path_prefix: String,

    /// Allowed methods; empty means any.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Upstream group to forward to.
    #[serde(default = "default_group")]
    pub upstream_group: String,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

/// Timeout configuration for outbound calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Deadline for each upstream attempt (and the email call) in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 10,
        }
    }
}

/// CORS header configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; "*" allows any.
    pub allow_origins: Vec<String>,

    pub allow_methods: Vec<String>,

    pub allow_headers: Vec<String>,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,

    /// Status for preflight answers (200 or 204).
    pub preflight_status: u16,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allow_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            max_age_secs: 86_400,
            preflight_status: 204,
        }
    }
}

/// Email side channel configuration.
///
/// Credentials belong in the environment (`EDGE_PROXY_EMAIL_*`), not in
/// the file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Enable the side channel.
    pub enabled: bool,

    /// Provider label reported in responses.
    pub provider: String,

    /// HTTPS endpoint accepting the email-send request.
    pub endpoint: Option<String>,

    pub service_id: String,

    pub template_id: String,

    pub user_id: String,

    /// Private access token, if the provider requires one.
    pub access_token: Option<String>,

    /// Recipient of contact notifications.
    pub to_address: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "emailjs".to_string(),
            endpoint: None,
            service_id: String::new(),
            template_id: String::new(),
            user_id: String::new(),
            access_token: None,
            to_address: None,
        }
    }
}

/// Offline fallback configuration. Everything is off by default.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OfflineConfig {
    /// Master switch; when false no fallback ever fires.
    pub enabled: bool,

    /// Canned success for OTP requests.
    pub request_otp: bool,

    /// Accept the demo credentials for OTP verification.
    pub verify_otp: bool,

    /// Synthesized submission for access requests.
    pub request_access: bool,

    /// Synthesized status/metrics/cluster snapshots.
    pub snapshots: bool,

    pub demo_admin_email: Option<String>,

    pub demo_otp: Option<String>,
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes, inbound and buffered upstream bodies.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
