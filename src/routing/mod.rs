//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (API prefix check, table lookup)
//!     → matcher.rs (exact / prefix path conditions)
//!     → Return: Api(route) | MethodNotAllowed | NotFound | NonApi
//!
//! Table Compilation (at startup and on reload):
//!     built-in endpoints + RouteConfig[]
//!     → sort configured routes by priority
//!     → freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - No regex in hot path
//! - First match wins
//! - The same table feeds 404 listings and `/v1/info`

pub mod matcher;
pub mod router;

pub use matcher::PathPattern;
pub use router::{Handler, Route, RouteMatch, Router, Snapshot};
