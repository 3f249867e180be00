//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - The request id set by the HTTP layer is attached to the trace span
//! - Metric updates are cheap and safe to call before the exporter exists

pub mod logging;
pub mod metrics;
