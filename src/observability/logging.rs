//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber once, at startup
//! - Resolve the filter from `RUST_LOG`, falling back to configuration
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level so operators can raise
//!   verbosity without editing the file
//! - Initialization is idempotent; a second call is a no-op (tests spin
//!   up several servers in one process)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_directives(level: &str) -> String {
    format!("edge_proxy={level},tower_http={level},warn", level = level)
}

/// Install the fmt subscriber with an env filter.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
