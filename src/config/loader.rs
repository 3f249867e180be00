//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{ProxyConfig, UpstreamConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, apply environment overrides and validate a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config = parse_config(&content)?;
    finalize(config, |key| std::env::var(key).ok())
}

/// Build a configuration from defaults plus the environment alone.
pub fn load_from_env() -> Result<ProxyConfig, ConfigError> {
    finalize(ProxyConfig::default(), |key| std::env::var(key).ok())
}

pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

fn finalize<F>(mut config: ProxyConfig, lookup: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_env_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay `EDGE_PROXY_*` variables on top of file values.
///
/// `EDGE_PROXY_UPSTREAMS` is a comma-separated, ordered list of base URLs
/// that replaces the default group's candidates.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(bind) = get("EDGE_PROXY_BIND") {
        config.listener.bind_address = bind;
    }

    if let Some(list) = get("EDGE_PROXY_UPSTREAMS") {
        let group = config.service.default_group.clone();
        config.upstreams.retain(|u| u.group != group);
        for (i, base_url) in list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .enumerate()
        {
            config.upstreams.push(UpstreamConfig {
                name: format!("{}-{}", group, i + 1),
                group: group.clone(),
                base_url: base_url.to_string(),
            });
        }
    }

    if let Some(secs) = get("EDGE_PROXY_UPSTREAM_TIMEOUT_SECS") {
        match secs.parse() {
            Ok(secs) => config.timeouts.upstream_secs = secs,
            Err(_) => tracing::warn!(value = %secs, "Ignoring invalid EDGE_PROXY_UPSTREAM_TIMEOUT_SECS"),
        }
    }

    if let Some(endpoint) = get("EDGE_PROXY_EMAIL_ENDPOINT") {
        config.email.endpoint = Some(endpoint);
        config.email.enabled = true;
    }
    if let Some(token) = get("EDGE_PROXY_EMAIL_ACCESS_TOKEN") {
        config.email.access_token = Some(token);
    }
    if let Some(to) = get("EDGE_PROXY_EMAIL_TO") {
        config.email.to_address = Some(to);
    }

    if let Some(email) = get("EDGE_PROXY_DEMO_ADMIN_EMAIL") {
        config.offline.demo_admin_email = Some(email);
    }
    if let Some(otp) = get("EDGE_PROXY_DEMO_OTP") {
        config.offline.demo_otp = Some(otp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_upstream_list_replaces_default_group() {
        let mut config = parse_config(
            r#"
            [[upstreams]]
            name = "old"
            base_url = "http://10.0.0.1"

            [[upstreams]]
            name = "static"
            group = "static"
            base_url = "http://10.0.0.9"
            "#,
        )
        .unwrap();

        apply_env_overrides(
            &mut config,
            env(&[("EDGE_PROXY_UPSTREAMS", "http://a.internal, http://b.internal")]),
        );

        let api: Vec<_> = config
            .upstreams
            .iter()
            .filter(|u| u.group == "api")
            .map(|u| u.base_url.as_str())
            .collect();
        assert_eq!(api, vec!["http://a.internal", "http://b.internal"]);
        assert!(config.upstreams.iter().any(|u| u.name == "static"));
    }

    #[test]
    fn test_secrets_come_from_environment() {
        let mut config = ProxyConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("EDGE_PROXY_EMAIL_ENDPOINT", "https://mail.example/send"),
                ("EDGE_PROXY_EMAIL_ACCESS_TOKEN", "tok"),
                ("EDGE_PROXY_DEMO_OTP", "000111"),
                ("EDGE_PROXY_BIND", "127.0.0.1:9000"),
            ]),
        );
        assert!(config.email.enabled);
        assert_eq!(config.email.access_token.as_deref(), Some("tok"));
        assert_eq!(config.offline.demo_otp.as_deref(), Some("000111"));
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn test_blank_and_invalid_values_are_ignored() {
        let mut config = ProxyConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("EDGE_PROXY_BIND", "   "),
                ("EDGE_PROXY_UPSTREAM_TIMEOUT_SECS", "soon"),
            ]),
        );
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.timeouts.upstream_secs, 10);
    }

    #[test]
    fn test_finalize_rejects_invalid_override() {
        let result = finalize(
            ProxyConfig::default(),
            env(&[("EDGE_PROXY_UPSTREAMS", "not a url")]),
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
