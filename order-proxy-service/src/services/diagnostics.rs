//! Upstream diagnostic payloads.
//!
//! Provider responses are passed back to the caller and into the logs as
//! opaque JSON. Credentials must never travel with them, so every payload goes
//! through [`scrub`] first.

use serde_json::{json, Map, Value};

pub const REDACTED: &str = "[REDACTED]";

/// Interprets a raw response body: JSON when it parses, plain text otherwise.
pub fn payload_from_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Payload describing a failure that produced no upstream response.
pub fn transport_payload(err: &reqwest::Error) -> Value {
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_decode() || err.is_body() {
        "body"
    } else {
        "request"
    };
    json!({ "message": err.to_string(), "kind": kind })
}

/// Replaces every string value containing one of `secrets` with [`REDACTED`].
///
/// Empty secrets are ignored, otherwise every string would match.
pub fn scrub(value: Value, secrets: &[&str]) -> Value {
    let secrets: Vec<&str> = secrets.iter().copied().filter(|s| !s.is_empty()).collect();
    if secrets.is_empty() {
        return value;
    }
    scrub_value(value, &secrets)
}

fn scrub_value(value: Value, secrets: &[&str]) -> Value {
    match value {
        Value::String(s) if secrets.iter().any(|secret| s.contains(secret)) => {
            Value::String(REDACTED.to_string())
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| scrub_value(item, secrets))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, scrub_value(v, secrets)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}
