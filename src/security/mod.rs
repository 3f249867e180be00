//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (answer preflight, stamp CORS headers on the way out)
//!     → headers.rs (sanitize, add X-Forwarded-*) before forwarding
//! Upstream response:
//!     → headers.rs (strip hop-by-hop)
//! ```
//!
//! # Design Decisions
//! - Preflight never reaches routing or an upstream
//! - Upstream CORS headers are always overwritten, never merged

pub mod cors;
pub mod headers;
