//! Login and admin OTP endpoints.
//!
//! All three validate, forward with the body re-serialized as JSON, and
//! add an `edge_proxy` object to the upstream answer. The OTP endpoints
//! may fall back to the offline policy when the upstream has failed
//! (never when it answered 4xx).

use std::sync::Arc;

use axum::{http::StatusCode, response::Response};
use serde_json::{json, Map, Value};

use crate::error::ProxyResult;
use crate::handlers::{
    edge_metadata, forward_json, offline_answer, validate::validate, ApiCall, UpstreamJson,
    EDGE_METADATA_KEY,
};
use crate::http::response::{json_object_response, json_response};
use crate::http::server::InnerState;
use crate::routing::Handler;
use crate::upstream::Upstream;

pub async fn login(
    state: &InnerState,
    call: &ApiCall,
    candidates: &[Arc<Upstream>],
) -> ProxyResult<Response> {
    let body = validated(call, Handler::Login)?;
    let upstream = forward_json(state, call.outbound_json(&body), candidates).await?;
    Ok(enriched(state, upstream))
}

pub async fn request_otp(
    state: &InnerState,
    call: &ApiCall,
    candidates: &[Arc<Upstream>],
) -> ProxyResult<Response> {
    let body = validated(call, Handler::RequestOtp)?;

    match forward_json(state, call.outbound_json(&body), candidates).await {
        Ok(upstream) => Ok(enriched(state, upstream)),
        Err(e) => match offline_answer("request_otp", &e, || state.offline.otp_requested(&body)) {
            Some(value) => Ok(json_response(StatusCode::OK, value)),
            None => Err(e),
        },
    }
}

pub async fn verify_otp(
    state: &InnerState,
    call: &ApiCall,
    candidates: &[Arc<Upstream>],
) -> ProxyResult<Response> {
    let body = validated(call, Handler::VerifyOtp)?;

    match forward_json(state, call.outbound_json(&body), candidates).await {
        Ok(upstream) => Ok(enriched(state, upstream)),
        Err(e) => match offline_answer("verify_otp", &e, || state.offline.verify_otp(&body)) {
            Some((status, value)) => Ok(json_response(status, value)),
            None => Err(e),
        },
    }
}

fn validated(call: &ApiCall, handler: Handler) -> ProxyResult<Map<String, Value>> {
    let body = call.json_body()?;
    validate(handler, &body)?;
    Ok(body)
}

fn enriched(state: &InnerState, mut upstream: UpstreamJson) -> Response {
    let meta = edge_metadata(state, json!({ "upstream": upstream.upstream }));
    upstream.body.insert(EDGE_METADATA_KEY.to_string(), meta);
    json_object_response(upstream.status, upstream.body)
}
