//! Edge-served discovery payloads: `{prefix}/v1/info` and non-API paths.

use axum::{extract::Request, http::StatusCode, response::Response};
use serde_json::{json, Value};

use crate::error::ProxyResult;
use crate::handlers::{passthrough, ApiCall};
use crate::http::response::{json_response, timestamp};
use crate::http::server::InnerState;

/// `GET {prefix}/v1/info`, built from the routing table.
pub fn handle(state: &InnerState) -> Response {
    let endpoints: Vec<Value> = state
        .router
        .routes()
        .iter()
        .map(|route| {
            json!({
                "name": route.name,
                "path": route.pattern.to_string(),
                "methods": route.methods.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
                "upstream_group": route.upstream_group,
            })
        })
        .collect();

    let mut groups: Vec<&str> = state.upstreams.group_names().collect();
    groups.sort_unstable();

    json_response(
        StatusCode::OK,
        json!({
            "name": state.config.service.name,
            "version": state.config.service.version,
            "api_prefix": state.router.api_prefix(),
            "endpoints": endpoints,
            "upstream_groups": groups,
            "email_integration": state.notifier.is_some(),
            "offline_fallbacks": !state.offline.is_disabled(),
            "timestamp": timestamp(),
        }),
    )
}

/// Anything outside the API prefix.
///
/// Forwarded to the static group when one is configured, otherwise
/// answered with a pointer to the API.
pub async fn non_api(state: &InnerState, request: Request) -> ProxyResult<Response> {
    if let Some(group) = &state.config.service.static_group {
        let call = ApiCall::read(request, state.config.security.max_body_size).await?;
        return passthrough(state, call.outbound(), state.upstreams.candidates(group)).await;
    }

    Ok(json_response(
        StatusCode::OK,
        json!({
            "service": state.config.service.name,
            "message": format!(
                "Edge proxy: API requests are served under {}",
                state.router.api_prefix()
            ),
            "path": request.uri().path(),
            "available_endpoints": state.router.available_endpoints(),
            "timestamp": timestamp(),
        }),
    ))
}
