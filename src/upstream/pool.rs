//! Upstream pool management.
//!
//! # Responsibilities
//! - Group configured origins by logical backend name
//! - Preserve declaration order inside a group (it is the fallback order)
//! - Build outbound URLs from a base URL plus the inbound path and query

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Uri;
use url::Url;

use crate::config::UpstreamConfig;

/// A single upstream origin.
#[derive(Debug)]
pub struct Upstream {
    pub name: String,
    /// Group this origin serves; reported with every attempt.
    pub group: String,
    /// Base URL without trailing slash, ready for concatenation.
    base: String,
}

impl Upstream {
    pub fn new(
        name: impl Into<String>,
        group: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, url::ParseError> {
        let url = Url::parse(base_url)?;
        let base = url.as_str().trim_end_matches('/').to_string();
        Ok(Self {
            name: name.into(),
            group: group.into(),
            base,
        })
    }

    /// `base + path + query`, exactly as the inbound request carried them.
    pub fn target_uri(&self, path_and_query: &str) -> Result<Uri, axum::http::uri::InvalidUri> {
        format!("{}{}", self.base, path_and_query).parse()
    }
}

/// Ordered candidate lists keyed by group name.
#[derive(Debug, Default)]
pub struct UpstreamPool {
    groups: HashMap<String, Vec<Arc<Upstream>>>,
}

impl UpstreamPool {
    pub fn new(configs: &[UpstreamConfig]) -> Self {
        let mut groups: HashMap<String, Vec<Arc<Upstream>>> = HashMap::new();

        for config in configs {
            match Upstream::new(&config.name, &config.group, &config.base_url) {
                Ok(upstream) => groups
                    .entry(config.group.clone())
                    .or_default()
                    .push(Arc::new(upstream)),
                Err(e) => {
                    tracing::warn!(name = %config.name, base_url = %config.base_url, error = %e, "Invalid upstream URL, skipping")
                }
            }
        }

        Self { groups }
    }

    /// Candidates for a group, in fallback order. Unknown groups are empty.
    pub fn candidates(&self, group: &str) -> &[Arc<Upstream>] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}
