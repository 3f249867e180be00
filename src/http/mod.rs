//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, layer stack, graceful shutdown)
//!     → request.rs (request id, tracing span)
//!     → security::cors (preflight short-circuit, CORS stamping)
//!     → handlers (routing table, forwarding)
//!     → response.rs (JSON bodies, upstream response conversion)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, InnerState};
