//! Credential redaction for log entries.

use crate::ObservabilityMode;
use serde_json::{Map, Value};
use std::collections::HashMap;

const REDACTED: &str = "[REDACTED]";

const DENYLIST_KEYS: [&str; 7] = [
    "token",
    "authorization",
    "cookie",
    "credential",
    "password",
    "secret",
    "private_key",
];

const PROD_ALLOWED_FIELDS: [&str; 8] = [
    "session_id",
    "query",
    "generation",
    "status",
    "num_items",
    "item_count",
    "error",
    "component",
];

/// Apply the redaction policy for `mode` to a field map.
pub fn redact_fields(
    fields: HashMap<String, Value>,
    mode: ObservabilityMode,
) -> HashMap<String, Value> {
    fields
        .into_iter()
        .filter(|(key, _)| match mode {
            ObservabilityMode::DevVerbose => true,
            ObservabilityMode::ProdMetadataOnly => PROD_ALLOWED_FIELDS.contains(&key.as_str()),
        })
        .map(|(key, value)| {
            let value = sanitize_value(&key, &value);
            (key, value)
        })
        .collect()
}

/// Redact a free-form message: token-shaped words are replaced.
pub fn redact_message(message: &str) -> String {
    if looks_like_bearer(message) {
        return REDACTED.to_string();
    }
    message
        .split(' ')
        .map(|word| {
            if looks_like_sensitive_value(word) {
                REDACTED
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn sanitize_value(key: &str, value: &Value) -> Value {
    if is_sensitive_key(key) {
        return Value::String(REDACTED.to_string());
    }

    match value {
        Value::String(s) => sanitize_string(s),
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), sanitize_value(k, v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| sanitize_value(key, item))
                .collect::<Vec<_>>(),
        ),
        _ => value.clone(),
    }
}

fn sanitize_string(raw: &str) -> Value {
    if looks_like_bearer(raw) || looks_like_sensitive_value(raw) {
        return Value::String(REDACTED.to_string());
    }
    if raw.len() > 512 {
        return Value::String(format!("[TRUNCATED:{} bytes]", raw.len()));
    }
    Value::String(raw.to_string())
}

fn looks_like_bearer(raw: &str) -> bool {
    raw.to_ascii_lowercase().starts_with("bearer ")
}

fn looks_like_sensitive_value(raw: &str) -> bool {
    // Three-segment JWT.
    if raw.matches('.').count() == 2 && raw.len() > 40 {
        return true;
    }
    is_long_hex(raw) || is_long_base64(raw)
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    DENYLIST_KEYS.iter().any(|entry| lower.contains(entry))
}

fn is_long_hex(value: &str) -> bool {
    value.len() > 48 && value.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_long_base64(value: &str) -> bool {
    value.len() > 48
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '_' | '-'))
}
