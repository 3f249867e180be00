//! Read-only snapshots: `/v1/status`, `/v1/metrics`, `/v1/clusters`.
//!
//! Pass-through when an upstream answers; synthesized by the offline
//! policy (if enabled) when none does.

use std::sync::Arc;

use axum::{http::StatusCode, response::Response};

use crate::error::ProxyResult;
use crate::handlers::{offline_answer, passthrough, ApiCall};
use crate::http::response::json_response;
use crate::http::server::InnerState;
use crate::routing::Snapshot;
use crate::upstream::Upstream;

pub async fn handle(
    state: &InnerState,
    call: &ApiCall,
    candidates: &[Arc<Upstream>],
    kind: Snapshot,
) -> ProxyResult<Response> {
    match passthrough(state, call.outbound(), candidates).await {
        Ok(response) => Ok(response),
        Err(e) => match offline_answer(kind.as_str(), &e, || state.offline.snapshot(kind)) {
            Some(value) => Ok(json_response(StatusCode::OK, value)),
            None => Err(e),
        },
    }
}
