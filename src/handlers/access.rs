//! `POST {prefix}/v1/request-access`.
//!
//! Every successful answer carries a `request_id` and `next_steps`; the
//! edge fills them in when the upstream leaves them out.

use std::sync::Arc;

use axum::{http::StatusCode, response::Response};
use serde_json::Value;

use crate::error::ProxyResult;
use crate::handlers::{forward_json, offline_answer, validate::validate, ApiCall};
use crate::http::response::{json_object_response, json_response};
use crate::http::server::InnerState;
use crate::resilience::offline::{access_request_id, ensure_next_steps};
use crate::routing::Handler;
use crate::upstream::Upstream;

pub async fn handle(
    state: &InnerState,
    call: &ApiCall,
    candidates: &[Arc<Upstream>],
) -> ProxyResult<Response> {
    let request = call.json_body()?;
    validate(Handler::RequestAccess, &request)?;

    match forward_json(state, call.outbound_json(&request), candidates).await {
        Ok(upstream) => {
            let mut body = upstream.body;
            if !body.get("request_id").is_some_and(|id| !id.is_null()) {
                body.insert("request_id".into(), Value::String(access_request_id()));
            }
            if !body.contains_key("notification_email") {
                if let Some(email) = request.get("email") {
                    body.insert("notification_email".into(), email.clone());
                }
            }
            ensure_next_steps(&mut body);
            Ok(json_object_response(upstream.status, body))
        }
        Err(e) => match offline_answer("request_access", &e, || state.offline.access_requested(&request)) {
            Some(value) => Ok(json_response(StatusCode::OK, value)),
            None => Err(e),
        },
    }
}
