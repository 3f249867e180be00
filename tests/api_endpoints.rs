//! End-to-end endpoint behavior through a live proxy.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

mod common;

use common::{closed_port, config_with_upstreams, spawn_backend, start_proxy, Hits};

fn contact() -> Value {
    json!({
        "name": "Ada",
        "email": "ada@example.com",
        "message": "Hello",
    })
}

/// Upstream that accepts contact submissions and issues a ticket.
async fn contact_backend(hits: Hits) -> std::net::SocketAddr {
    spawn_backend(Router::new().route(
        "/api/v1/contact",
        post(move |Json(_body): Json<Value>| {
            let hits = hits.clone();
            async move {
                hits.hit();
                Json(json!({"status": "received", "ticket_id": "T-1"}))
            }
        }),
    ))
    .await
}

/// Email endpoint that records every payload and answers with `status`.
async fn email_backend(status: StatusCode) -> (std::net::SocketAddr, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();
    let addr = spawn_backend(Router::new().route(
        "/send",
        post(move |Json(body): Json<Value>| {
            let recorded = recorded.clone();
            async move {
                recorded.lock().unwrap().push(body);
                (status, "OK")
            }
        }),
    ))
    .await;
    (addr, seen)
}

fn with_email(config: &mut edge_proxy::ProxyConfig, addr: std::net::SocketAddr) {
    config.email.enabled = true;
    config.email.endpoint = Some(format!("http://{}/send", addr));
    config.email.service_id = "svc".into();
    config.email.template_id = "tpl".into();
    config.email.user_id = "user".into();
    config.email.to_address = Some("ops@example.com".into());
}

#[tokio::test]
async fn test_preflight_is_answered_at_the_edge() {
    let hits = Hits::default();
    let backend = contact_backend(hits.clone()).await;
    let proxy = start_proxy(config_with_upstreams(&[backend])).await;

    let res = proxy
        .client
        .request(reqwest::Method::OPTIONS, proxy.url("/api/v1/contact"))
        .header("origin", "https://site.example")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 204);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert!(res.headers().contains_key("access-control-allow-methods"));
    assert!(res.headers().contains_key("access-control-allow-headers"));
    assert!(res.text().await.unwrap().is_empty());
    assert_eq!(hits.count(), 0);
}

#[tokio::test]
async fn test_contact_missing_fields() {
    let hits = Hits::default();
    let backend = contact_backend(hits.clone()).await;
    let proxy = start_proxy(config_with_upstreams(&[backend])).await;

    let res = proxy
        .client
        .post(proxy.url("/api/v1/contact"))
        .json(&json!({"name": "Ada"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["missing_fields"], json!(["email", "message"]));
    assert_eq!(hits.count(), 0);
}

#[tokio::test]
async fn test_contact_without_email_channel() {
    let hits = Hits::default();
    let backend = contact_backend(hits.clone()).await;
    let proxy = start_proxy(config_with_upstreams(&[backend])).await;

    let res = proxy
        .client
        .post(proxy.url("/api/v1/contact"))
        .json(&contact())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "received");
    assert_eq!(body["ticket_id"], "T-1");
    assert_eq!(body["email_sent"], false);
    assert_eq!(body["email_service"], "none");
    assert_eq!(hits.count(), 1);
}

#[tokio::test]
async fn test_contact_email_delivered() {
    let backend = contact_backend(Hits::default()).await;
    let (email, seen) = email_backend(StatusCode::OK).await;
    let mut config = config_with_upstreams(&[backend]);
    with_email(&mut config, email);
    let proxy = start_proxy(config).await;

    let res = proxy
        .client
        .post(proxy.url("/api/v1/contact"))
        .json(&contact())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ticket_id"], "T-1");
    assert_eq!(body["email_sent"], true);
    assert_eq!(body["email_service"], "emailjs");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["service_id"], "svc");
    assert_eq!(seen[0]["template_params"]["from_name"], "Ada");
    assert_eq!(seen[0]["template_params"]["to_email"], "ops@example.com");
    assert_eq!(seen[0]["template_params"]["subject"], "Contact Request");
}

#[tokio::test]
async fn test_contact_email_failure_keeps_upstream_status() {
    let backend = contact_backend(Hits::default()).await;
    let (email, _seen) = email_backend(StatusCode::INTERNAL_SERVER_ERROR).await;
    let mut config = config_with_upstreams(&[backend]);
    with_email(&mut config, email);
    let proxy = start_proxy(config).await;

    let res = proxy
        .client
        .post(proxy.url("/api/v1/contact"))
        .json(&contact())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ticket_id"], "T-1");
    assert_eq!(body["email_sent"], false);
    assert!(body["email_error"].as_str().unwrap().contains("500"));
}

#[tokio::test]
async fn test_contact_email_unreachable() {
    let backend = contact_backend(Hits::default()).await;
    let mut config = config_with_upstreams(&[backend]);
    with_email(&mut config, closed_port().await);
    let proxy = start_proxy(config).await;

    let res = proxy
        .client
        .post(proxy.url("/api/v1/contact"))
        .json(&contact())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["email_sent"], false);
    assert!(body["email_error"].is_string());
}

#[tokio::test]
async fn test_invalid_json_body() {
    let proxy = start_proxy(config_with_upstreams(&[closed_port().await])).await;

    let res = proxy
        .client
        .post(proxy.url("/api/v1/contact"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Invalid JSON in request body");
}

#[tokio::test]
async fn test_login_requires_a_credential_form() {
    let hits = Hits::default();
    let backend = contact_backend(hits.clone()).await;
    let proxy = start_proxy(config_with_upstreams(&[backend])).await;

    let res = proxy
        .client
        .post(proxy.url("/api/v1/auth/login"))
        .json(&json!({"email": "ada@example.com"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    assert_eq!(hits.count(), 0);
}

#[tokio::test]
async fn test_login_is_enriched() {
    let backend = spawn_backend(Router::new().route(
        "/api/v1/auth/login",
        post(|Json(body): Json<Value>| async move {
            Json(json!({"token": "t-1", "key_seen": body["api_key"]}))
        }),
    ))
    .await;
    let proxy = start_proxy(config_with_upstreams(&[backend])).await;

    let res = proxy
        .client
        .post(proxy.url("/api/v1/auth/login"))
        .json(&json!({"api_key": "ak_1"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["token"], "t-1");
    assert_eq!(body["key_seen"], "ak_1");
    assert_eq!(body["edge_proxy"]["processed"], true);
}

#[tokio::test]
async fn test_method_not_allowed() {
    let proxy = start_proxy(config_with_upstreams(&[closed_port().await])).await;

    let res = proxy
        .client
        .get(proxy.url("/api/v1/contact"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 405);
    let allow = res.headers()["allow"].to_str().unwrap().to_string();
    assert!(allow.contains("POST"));
    let body: Value = res.json().await.unwrap();
    assert!(body["allowed_methods"].as_array().unwrap().contains(&json!("POST")));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let hits = Hits::default();
    let backend = contact_backend(hits.clone()).await;
    let mut config = config_with_upstreams(&[backend]);
    config.security.max_body_size = 256;
    let proxy = start_proxy(config).await;

    let res = proxy
        .client
        .post(proxy.url("/api/v1/contact"))
        .json(&json!({"name": "Ada", "email": "ada@example.com", "message": "x".repeat(1024)}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 413);
    assert_eq!(hits.count(), 0);
}

#[tokio::test]
async fn test_unknown_api_path() {
    let proxy = start_proxy(config_with_upstreams(&[closed_port().await])).await;

    let res = proxy
        .client
        .get(proxy.url("/api/v1/unknown"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 404);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    let body: Value = res.json().await.unwrap();
    let endpoints = body["available_endpoints"].as_array().unwrap();
    assert!(!endpoints.is_empty());
    assert!(endpoints.contains(&json!("POST /api/v1/contact")));
}

#[tokio::test]
async fn test_non_api_path_is_informational() {
    let proxy = start_proxy(config_with_upstreams(&[closed_port().await])).await;

    let res = proxy.client.get(proxy.url("/about")).send().await.unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/about");
    assert!(body["available_endpoints"].is_array());
}

#[tokio::test]
async fn test_non_api_path_uses_static_group() {
    let site = spawn_backend(Router::new().route(
        "/about",
        get(|| async { ([("content-type", "text/html")], "<h1>About</h1>") }),
    ))
    .await;
    let mut config = config_with_upstreams(&[]);
    config.upstreams.push(edge_proxy::config::UpstreamConfig {
        name: "site".into(),
        group: "static".into(),
        base_url: format!("http://{}", site),
    });
    config.service.static_group = Some("static".into());
    let proxy = start_proxy(config).await;

    let res = proxy.client.get(proxy.url("/about")).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "<h1>About</h1>");
}

#[tokio::test]
async fn test_health_is_enriched_and_stable() {
    let backend = spawn_backend(Router::new().route(
        "/api/health",
        get(|| async { Json(json!({"status": "healthy", "database": "ok"})) }),
    ))
    .await;
    let proxy = start_proxy(config_with_upstreams(&[backend])).await;

    let mut key_sets = Vec::new();
    for _ in 0..2 {
        let res = proxy.client.get(proxy.url("/api/health")).send().await.unwrap();
        assert_eq!(res.status(), 200);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["database"], "ok");
        assert_eq!(body["edge_proxy"]["status"], "active");
        assert_eq!(body["edge_proxy"]["email_integration"], false);
        key_sets.push(body.as_object().unwrap().keys().cloned().collect::<BTreeSet<_>>());
    }
    assert_eq!(key_sets[0], key_sets[1]);
}

#[tokio::test]
async fn test_cors_overrides_upstream_headers() {
    let backend = spawn_backend(Router::new().route(
        "/api/v1/status",
        get(|| async {
            (
                [("access-control-allow-origin", "https://evil.example")],
                Json(json!({"status": "operational"})),
            )
        }),
    ))
    .await;
    let proxy = start_proxy(config_with_upstreams(&[backend])).await;

    let res = proxy
        .client
        .get(proxy.url("/api/v1/status"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let origins: Vec<_> = res
        .headers()
        .get_all("access-control-allow-origin")
        .iter()
        .collect();
    assert_eq!(origins, vec!["*"]);
}

#[tokio::test]
async fn test_cors_allow_list_echoes_origin() {
    let backend = spawn_backend(Router::new().route(
        "/api/v1/status",
        get(|| async { Json(json!({"status": "operational"})) }),
    ))
    .await;
    let mut config = config_with_upstreams(&[backend]);
    config.cors.allow_origins = vec!["https://site.example".into()];
    let proxy = start_proxy(config).await;

    let res = proxy
        .client
        .get(proxy.url("/api/v1/status"))
        .header("origin", "https://site.example")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["access-control-allow-origin"], "https://site.example");

    let res = proxy
        .client
        .get(proxy.url("/api/v1/status"))
        .header("origin", "https://other.example")
        .send()
        .await
        .unwrap();
    assert!(!res.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_request_access_fills_in_identifiers() {
    let backend = spawn_backend(Router::new().route(
        "/api/v1/request-access",
        post(|| async { Json(json!({"status": "submitted"})) }),
    ))
    .await;
    let proxy = start_proxy(config_with_upstreams(&[backend])).await;

    let res = proxy
        .client
        .post(proxy.url("/api/v1/request-access"))
        .json(&json!({"name": "Ada", "email": "ada@example.com", "company": "AE"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "submitted");
    assert!(body["request_id"].as_str().unwrap().starts_with("ACCESS-"));
    assert_eq!(body["notification_email"], "ada@example.com");
    assert!(!body["next_steps"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_info_describes_routing_table() {
    let proxy = start_proxy(config_with_upstreams(&[closed_port().await])).await;

    let res = proxy.client.get(proxy.url("/api/v1/info")).send().await.unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["api_prefix"], "/api");
    assert_eq!(body["upstream_groups"], json!(["api"]));
    let names: Vec<_> = body["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap().to_string())
        .collect();
    assert!(names.contains(&"contact".to_string()));
}

#[tokio::test]
async fn test_configured_route_passes_through() {
    let backend = spawn_backend(Router::new().route(
        "/api/v2/reports/weekly",
        get(|| async { Json(json!({"report": "weekly"})) }),
    ))
    .await;
    let mut config = config_with_upstreams(&[backend]);
    config.routes.push(edge_proxy::config::RouteConfig {
        name: "reports".into(),
        path_prefix: "/api/v2/reports".into(),
        methods: vec!["GET".into()],
        upstream_group: "api".into(),
        priority: 10,
    });
    let proxy = start_proxy(config).await;

    let res = proxy
        .client
        .get(proxy.url("/api/v2/reports/weekly"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["report"], "weekly");
}
