//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)  +  EDGE_PROXY_* environment
//!     → loader.rs (parse, deserialize, apply overrides)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into server state
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps its compiled state atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Secrets and upstream hostnames are injected, never compiled in

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    CorsConfig, EmailConfig, ListenerConfig, ObservabilityConfig, OfflineConfig, ProxyConfig,
    RouteConfig, SecurityConfig, ServiceConfig, TimeoutConfig, UpstreamConfig,
};
