//! Backend wire types

use serde::Deserialize;
use serde_json::{Map, Value};

/// Tokens returned by the login, OTP and refresh endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// OTP endpoints take either an `email` or a `phone` field
pub(crate) fn otp_identity(identifier: &str, otp: Option<&str>) -> Value {
    let key = if identifier.contains('@') { "email" } else { "phone" };
    let mut body = Map::new();
    body.insert(key.to_string(), Value::String(identifier.to_string()));
    if let Some(otp) = otp {
        body.insert("otp".to_string(), Value::String(otp.to_string()));
    }
    Value::Object(body)
}

/// Code and message extracted from an error response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ErrorDetail {
    pub code: Option<String>,
    pub message: String,
}

impl ErrorDetail {
    /// Parse `{"detail": ...}`, `{"message": ...}` or `{"error": ...}`
    /// bodies, with an optional `code`/`error_code`. Anything else is
    /// passed through as text.
    pub fn parse(body: &str, fallback: &str) -> Self {
        let text = body.trim();
        let Ok(Value::Object(object)) = serde_json::from_str::<Value>(text) else {
            return Self {
                code: None,
                message: if text.is_empty() { fallback } else { text }.to_string(),
            };
        };

        let mut code = ["code", "error_code"]
            .iter()
            .find_map(|key| object.get(*key).and_then(scalar_text));
        let mut message = None;

        for key in ["detail", "message", "error"] {
            match object.get(key) {
                Some(Value::String(s)) => message = Some(s.clone()),
                Some(Value::Array(items)) => {
                    let parts: Vec<String> = items.iter().filter_map(item_message).collect();
                    if !parts.is_empty() {
                        message = Some(parts.join("; "));
                    }
                }
                Some(Value::Object(inner)) => {
                    message = ["message", "msg", "detail"]
                        .iter()
                        .find_map(|k| inner.get(*k).and_then(scalar_text));
                    if code.is_none() {
                        code = ["code", "error_code"]
                            .iter()
                            .find_map(|k| inner.get(*k).and_then(scalar_text));
                    }
                }
                _ => {}
            }
            if message.is_some() {
                break;
            }
        }

        Self {
            code,
            message: message.unwrap_or_else(|| text.to_string()),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn item_message(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Object(inner) => inner.get("msg").and_then(scalar_text),
        _ => None,
    }
}
