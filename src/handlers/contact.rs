//! `POST {prefix}/v1/contact`.
//!
//! Validate, forward, then run the email side channel. The side channel
//! only ever adds `email_sent` / `email_error` / `email_service`; the
//! status code is always the upstream's.

use std::sync::Arc;

use axum::response::Response;
use serde_json::{Map, Value};

use crate::error::ProxyResult;
use crate::handlers::{forward_json, validate::validate, ApiCall};
use crate::http::response::json_object_response;
use crate::http::server::InnerState;
use crate::notifier::NotifyError;
use crate::observability::metrics;
use crate::routing::Handler;
use crate::upstream::Upstream;

pub async fn handle(
    state: &InnerState,
    call: &ApiCall,
    candidates: &[Arc<Upstream>],
) -> ProxyResult<Response> {
    let contact = call.json_body()?;
    validate(Handler::Contact, &contact)?;

    let upstream = forward_json(state, call.outbound_json(&contact), candidates).await?;
    let mut body = upstream.body;
    notify(state, &contact, &mut body).await;

    Ok(json_object_response(upstream.status, body))
}

async fn notify(state: &InnerState, contact: &Map<String, Value>, body: &mut Map<String, Value>) {
    let (provider, result) = match &state.notifier {
        Some(notifier) => (
            notifier.provider().to_string(),
            notifier.send_contact(contact).await,
        ),
        None => ("none".to_string(), Err(NotifyError::NotConfigured)),
    };

    match result {
        Ok(()) => {
            metrics::record_side_channel(&provider, "sent");
            body.insert("email_sent".into(), Value::Bool(true));
        }
        Err(e) => {
            if !matches!(e, NotifyError::NotConfigured) {
                tracing::warn!(provider = %provider, error = %e, "Contact email not sent");
            }
            metrics::record_side_channel(&provider, "failed");
            body.insert("email_sent".into(), Value::Bool(false));
            body.insert("email_error".into(), Value::String(e.to_string()));
        }
    }
    body.insert("email_service".into(), Value::String(provider));
}
