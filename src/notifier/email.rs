//! Transactional email side channel for contact submissions.
//!
//! # Responsibilities
//! - Reshape a contact payload into an EmailJS-compatible send request
//! - Post it with the shared per-attempt deadline
//!
//! # Design Decisions
//! - Failures are returned, never raised past the contact handler; the
//!   primary response keeps its status and records `email_sent: false`
//! - Credentials come from configuration/environment only

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::EmailConfig;
use crate::http::response::timestamp;

const DEFAULT_SUBJECT: &str = "Contact Request";

/// Why the side channel did not deliver.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("email service not configured")]
    NotConfigured,

    #[error("email service timed out")]
    Timeout,

    #[error("email service unreachable: {0}")]
    Transport(String),

    #[error("email service responded with {0}")]
    Status(u16),
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    template_params: TemplateParams<'a>,
}

#[derive(Debug, Serialize)]
struct TemplateParams<'a> {
    to_email: &'a str,
    from_name: &'a str,
    from_email: &'a str,
    subject: &'a str,
    message: &'a str,
    service: &'a str,
    timestamp: String,
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Sends contact notifications through an HTTP email API.
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    client: reqwest::Client,
    endpoint: String,
    provider: String,
    service_id: String,
    template_id: String,
    user_id: String,
    access_token: Option<String>,
    to_address: String,
}

impl EmailNotifier {
    /// `None` when the side channel is disabled or incomplete.
    pub fn from_config(config: &EmailConfig, timeout: Duration) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let (endpoint, to_address) = match (&config.endpoint, &config.to_address) {
            (Some(endpoint), Some(to)) => (endpoint.clone(), to.clone()),
            _ => {
                tracing::warn!("Email side channel enabled without endpoint or recipient");
                return None;
            }
        };

        let client = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build email client");
                return None;
            }
        };

        Some(Self {
            client,
            endpoint,
            provider: config.provider.clone(),
            service_id: config.service_id.clone(),
            template_id: config.template_id.clone(),
            user_id: config.user_id.clone(),
            access_token: config.access_token.clone(),
            to_address,
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    fn payload<'a>(&'a self, contact: &'a Map<String, Value>) -> SendRequest<'a> {
        let field = |key: &str| str_field(contact, key);
        let subject = match field("subject") {
            "" => DEFAULT_SUBJECT,
            subject => subject,
        };

        SendRequest {
            service_id: &self.service_id,
            template_id: &self.template_id,
            user_id: &self.user_id,
            access_token: self.access_token.as_deref(),
            template_params: TemplateParams {
                to_email: &self.to_address,
                from_name: field("name"),
                from_email: field("email"),
                subject,
                message: field("message"),
                service: field("service"),
                timestamp: timestamp(),
            },
        }
    }

    /// Post one notification for a contact submission.
    pub async fn send_contact(&self, contact: &Map<String, Value>) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.payload(contact))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout
                } else {
                    NotifyError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Status(status.as_u16()))
        }
    }
}
