//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! Handler picks an upstream group
//!     → pool.rs (ordered candidates for the group)
//!     → forward.rs (rebuild request, one attempt per candidate)
//!     → first 2xx response, or FallbackError
//! ```
//!
//! # Design Decisions
//! - Candidate order is configuration order; no load balancing
//! - Request bodies are buffered so they can be replayed per candidate
//! - Response bodies stream straight through unless a handler enriches them

pub mod forward;
pub mod pool;

pub use forward::{build_client, FallbackError, ForwardError, Forwarded, Forwarder, HttpClient, OutboundRequest};
pub use pool::{Upstream, UpstreamPool};
