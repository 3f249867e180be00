//! Best-effort side channels.
//!
//! Nothing here may change the status of the primary response.

pub mod email;

pub use email::{EmailNotifier, NotifyError};
