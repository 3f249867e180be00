//! Payload validation for the endpoints that take JSON input.
//!
//! A field counts as present only when it is a string with non-whitespace
//! content; `null`, numbers and blank strings are all "missing".

use serde_json::{Map, Value};

use crate::error::{ProxyError, ProxyResult};
use crate::routing::Handler;

pub const CONTACT_FIELDS: &[&str] = &["name", "email", "message"];
pub const ACCESS_FIELDS: &[&str] = &["name", "email", "company"];
pub const OTP_REQUEST_FIELDS: &[&str] = &["email"];
pub const OTP_VERIFY_FIELDS: &[&str] = &["email", "otp"];

pub fn validate(handler: Handler, body: &Map<String, Value>) -> ProxyResult<()> {
    match handler {
        Handler::Contact => require(body, CONTACT_FIELDS),
        Handler::RequestAccess => require(body, ACCESS_FIELDS),
        Handler::RequestOtp => require(body, OTP_REQUEST_FIELDS),
        Handler::VerifyOtp => require(body, OTP_VERIFY_FIELDS),
        Handler::Login => login(body),
        Handler::Health | Handler::Snapshot(_) | Handler::Info | Handler::Forward => Ok(()),
    }
}

fn present(body: &Map<String, Value>, field: &str) -> bool {
    matches!(body.get(field), Some(Value::String(s)) if !s.trim().is_empty())
}

fn require(body: &Map<String, Value>, required: &'static [&'static str]) -> ProxyResult<()> {
    let missing: Vec<&'static str> = required
        .iter()
        .copied()
        .filter(|field| !present(body, field))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProxyError::MissingFields { missing, required })
    }
}

/// Either `email` + `password`, or `api_key`.
fn login(body: &Map<String, Value>) -> ProxyResult<()> {
    let password_pair = present(body, "email") && present(body, "password");
    if password_pair || present(body, "api_key") {
        Ok(())
    } else {
        Err(ProxyError::BadRequest(
            "Provide either email and password, or api_key".to_string(),
        ))
    }
}
