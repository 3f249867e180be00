//! Path matching.
//!
//! # Responsibilities
//! - Match a request path exactly or by segment-aligned prefix
//! - Render a pattern for endpoint listings
//!
//! # Design Decisions
//! - Case-sensitive, no regex
//! - A prefix only matches on a segment boundary: `/api/v2` matches
//!   `/api/v2` and `/api/v2/x`, never `/api/v2beta`

use std::fmt;

/// A path condition for a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    pub fn exact(path: impl Into<String>) -> Self {
        PathPattern::Exact(path.into())
    }

    /// Trailing slashes are dropped so `/api/v2/` and `/api/v2` behave alike.
    pub fn prefix(path: impl Into<String>) -> Self {
        let path = path.into();
        let trimmed = path.trim_end_matches('/');
        PathPattern::Prefix(if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() })
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(expected) => path == expected,
            PathPattern::Prefix(prefix) => prefix_matches(prefix, path),
        }
    }
}

/// Segment-aligned prefix test, shared with the API prefix check.
pub fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return path.starts_with('/');
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPattern::Exact(path) => write!(f, "{}", path),
            PathPattern::Prefix(prefix) => write!(f, "{}/*", prefix.trim_end_matches('/')),
        }
    }
}
