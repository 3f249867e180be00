//! Offline fallback policy.
//!
//! # Responsibilities
//! - Decide per endpoint whether a synthesized answer may replace an
//!   upstream failure
//! - Build those answers (demo OTP flow, access submissions, snapshots)
//!
//! # Design Decisions
//! - Disabled unless configured; `disabled()` never produces anything
//! - Demo credentials come from configuration only and are never echoed
//! - Callers only consult the policy for upstream failures (network,
//!   timeout, 5xx, exhausted candidates), never for 4xx answers

use axum::http::StatusCode;
use rand::Rng;
use serde_json::{json, Map, Value};

use crate::config::OfflineConfig;
use crate::http::response::{epoch_millis, timestamp};
use crate::routing::Snapshot;

#[derive(Debug, Clone)]
struct DemoCredentials {
    email: String,
    otp: String,
}

/// Which endpoints may answer from the edge while upstreams are down.
#[derive(Debug, Clone, Default)]
pub struct OfflineFallbackPolicy {
    request_otp: bool,
    verify_otp: Option<DemoCredentials>,
    request_access: bool,
    snapshots: bool,
}

impl OfflineFallbackPolicy {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_config(config: &OfflineConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let verify_otp = match (config.verify_otp, &config.demo_admin_email, &config.demo_otp) {
            (true, Some(email), Some(otp)) => Some(DemoCredentials {
                email: email.clone(),
                otp: otp.clone(),
            }),
            (true, _, _) => {
                tracing::warn!("Offline OTP verification enabled without demo credentials");
                None
            }
            _ => None,
        };

        Self {
            request_otp: config.request_otp,
            verify_otp,
            request_access: config.request_access,
            snapshots: config.snapshots,
        }
    }

    pub fn is_disabled(&self) -> bool {
        !self.request_otp && self.verify_otp.is_none() && !self.request_access && !self.snapshots
    }

    /// Canned confirmation for an OTP request.
    pub fn otp_requested(&self, body: &Map<String, Value>) -> Option<Value> {
        if !self.request_otp {
            return None;
        }
        Some(json!({
            "status": "success",
            "message": "OTP request received (offline mode, no email sent)",
            "demo_mode": true,
            "email": body.get("email").cloned().unwrap_or(Value::Null),
            "backend_status": "offline",
            "timestamp": timestamp(),
        }))
    }

    /// Demo login when the configured credentials match.
    pub fn verify_otp(&self, body: &Map<String, Value>) -> Option<(StatusCode, Value)> {
        let demo = self.verify_otp.as_ref()?;
        let email = body.get("email").and_then(Value::as_str);
        let otp = body.get("otp").and_then(Value::as_str);

        if email == Some(demo.email.as_str()) && otp == Some(demo.otp.as_str()) {
            Some((
                StatusCode::OK,
                json!({
                    "status": "success",
                    "message": "Demo login successful (offline mode)",
                    "token": format!("demo_admin_token_{}", epoch_millis()),
                    "demo_mode": true,
                    "backend_status": "offline",
                    "timestamp": timestamp(),
                }),
            ))
        } else {
            Some((
                StatusCode::UNAUTHORIZED,
                json!({
                    "status": "error",
                    "message": "Invalid demo credentials (offline mode)",
                    "demo_mode": true,
                    "backend_status": "offline",
                    "timestamp": timestamp(),
                }),
            ))
        }
    }

    /// Synthesized access-request submission.
    pub fn access_requested(&self, body: &Map<String, Value>) -> Option<Value> {
        if !self.request_access {
            return None;
        }
        let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
        let level = body
            .get("accessLevel")
            .and_then(Value::as_str)
            .unwrap_or("enterprise");

        let mut response = json!({
            "status": "submitted",
            "message": "Access request recorded at the edge and queued for review",
            "request_id": access_request_id(),
            "submitted_at": timestamp(),
            "notification_email": email,
            "approval_status": "pending_review",
            "platform_access": { "type": level },
            "demo_mode": true,
            "backend_status": "offline",
        });
        if let Some(map) = response.as_object_mut() {
            ensure_next_steps(map);
        }
        Some(response)
    }

    /// Synthesized read-only snapshot.
    pub fn snapshot(&self, kind: Snapshot) -> Option<Value> {
        if !self.snapshots {
            return None;
        }
        let mut rng = rand::thread_rng();
        let mut value = match kind {
            Snapshot::Status => status_snapshot(&mut rng),
            Snapshot::Metrics => metrics_snapshot(&mut rng),
            Snapshot::Clusters => clusters_snapshot(&mut rng),
        };
        value["synthesized"] = json!(true);
        value["lastUpdated"] = json!(timestamp());
        Some(value)
    }
}

/// `ACCESS-<epoch millis>-<0..1000>`.
pub fn access_request_id() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1000);
    format!("ACCESS-{}-{}", epoch_millis(), suffix)
}

/// Add default review guidance unless the upstream already gave some.
pub fn ensure_next_steps(body: &mut Map<String, Value>) {
    if body.contains_key("next_steps") {
        return;
    }
    let email = body
        .get("notification_email")
        .or_else(|| body.get("email"))
        .and_then(Value::as_str)
        .unwrap_or("the submitted address")
        .to_string();
    body.insert(
        "next_steps".into(),
        json!([
            "Application under automated screening",
            format!("Confirmation will be sent to {}", email),
            "Manual review by the platform team",
            "Credentials are emailed if approved",
        ]),
    );
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn cluster_status(rng: &mut impl Rng, busy: &str) -> Value {
    json!({
        "status": if rng.gen_bool(0.9) { "online" } else { busy },
        "pods": rng.gen_range(4..9),
        "nodes": 3,
        "cpu": round1(rng.gen_range(35.0..55.0)),
        "memory": round1(rng.gen_range(60.0..75.0)),
    })
}

fn status_snapshot(rng: &mut impl Rng) -> Value {
    json!({
        "eks": cluster_status(rng, "maintenance"),
        "aks": cluster_status(rng, "scaling"),
        "gke": cluster_status(rng, "updating"),
        "activeDeployments": rng.gen_range(10..20),
    })
}

fn metrics_snapshot(rng: &mut impl Rng) -> Value {
    json!({
        "throughput": rng.gen_range(500..1000),
        "latency": round1(rng.gen_range(20.0..50.0)),
        "errorRate": (rng.gen_range(0.0..0.5_f64) * 100.0).round() / 100.0,
        "activeConnections": rng.gen_range(50..150),
        "memoryUsage": round1(rng.gen_range(60.0..80.0)),
        "cpuUsage": round1(rng.gen_range(40.0..70.0)),
    })
}

fn clusters_snapshot(rng: &mut impl Rng) -> Value {
    let clusters: Vec<Value> = [
        ("eks-prod-001", "aws", "us-east-1", 5),
        ("aks-staging-001", "azure", "eastus", 3),
        ("gke-dev-001", "gcp", "us-central1", 2),
    ]
    .iter()
    .map(|(id, provider, region, nodes)| {
        json!({
            "id": id,
            "provider": provider,
            "region": region,
            "status": "running",
            "nodes": nodes,
            "cpu_usage": round1(rng.gen_range(25.0..65.0)),
            "memory_usage": round1(rng.gen_range(45.0..80.0)),
        })
    })
    .collect();

    json!({
        "total_clusters": clusters.len(),
        "total_nodes": 10,
        "clusters": clusters,
    })
}
