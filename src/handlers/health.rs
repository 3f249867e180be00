//! `GET {prefix}/health`.
//!
//! Upstream health is relayed with an `edge_proxy` object added. When no
//! upstream answers, a `degraded` document is synthesized with status 200
//! so monitors always get JSON.

use std::sync::Arc;

use axum::{http::StatusCode, response::Response};
use serde_json::{json, Value};

use crate::handlers::{edge_metadata, forward_json, ApiCall, EDGE_METADATA_KEY};
use crate::http::response::{json_object_response, json_response, timestamp};
use crate::http::server::InnerState;
use crate::upstream::Upstream;

pub async fn handle(state: &InnerState, call: &ApiCall, candidates: &[Arc<Upstream>]) -> Response {
    match forward_json(state, call.outbound(), candidates).await {
        Ok(mut upstream) => {
            let meta = edge_metadata(
                state,
                json!({
                    "status": "active",
                    "upstream": upstream.upstream,
                    "email_integration": state.notifier.is_some(),
                }),
            );
            upstream.body.insert(EDGE_METADATA_KEY.to_string(), meta);
            json_object_response(upstream.status, upstream.body)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check upstream unavailable, reporting degraded");
            json_response(StatusCode::OK, degraded(state))
        }
    }
}

fn degraded(state: &InnerState) -> Value {
    json!({
        "service": state.config.service.name,
        "status": "degraded",
        "backend_status": "unavailable",
        "version": state.config.service.version,
        "timestamp": timestamp(),
        EDGE_METADATA_KEY: edge_metadata(
            state,
            json!({
                "status": "active",
                "email_integration": state.notifier.is_some(),
            }),
        ),
    })
}
