//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Handler gets an upstream failure
//!     → 4xx: relayed as-is
//!     → network / timeout / 5xx / exhausted: offline.rs may answer
//!     → otherwise the failure is rendered as JSON
//! ```
//!
//! # Design Decisions
//! - Per-attempt deadlines live in the forwarder; there is no retry
//!   backoff and no circuit breaker
//! - Synthesized answers are opt-in per endpoint

pub mod offline;

pub use offline::OfflineFallbackPolicy;
