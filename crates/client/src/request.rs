//! Per-call request context and decoded responses

use crate::error::ClientError;
use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Request body
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    /// `multipart/form-data` built from file parts
    Multipart(Vec<FilePart>),
    /// Pre-encoded body sent as is, e.g. a multipart upload relayed from
    /// the browser with its boundary intact
    Raw { content_type: String, body: Bytes },
}

/// One file field of a multipart upload
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl FilePart {
    /// A part for the `file` field
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            field: "file".to_string(),
            file_name: file_name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }
}

/// One call to a backend endpoint
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    endpoint: String,
    query: Option<String>,
    payload: Payload,
    timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            query: None,
            payload: Payload::Empty,
            timeout: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PATCH, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    /// Send `body` as JSON
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.payload = Payload::Json(body);
        self
    }

    /// Send URL-encoded form fields
    #[must_use]
    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.payload = Payload::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Send files as `multipart/form-data`
    #[must_use]
    pub fn multipart(mut self, parts: impl IntoIterator<Item = FilePart>) -> Self {
        self.payload = Payload::Multipart(parts.into_iter().collect());
        self
    }

    /// Send `body` unchanged with the given content type
    #[must_use]
    pub fn raw(mut self, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.payload = Payload::Raw {
            content_type: content_type.into(),
            body: body.into(),
        };
        self
    }

    /// Raw query string, without the leading `?`
    #[must_use]
    pub fn query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = (!query.is_empty()).then_some(query);
        self
    }

    /// Override the client's default timeout for this call
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    pub const fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    /// Safe to send more than once
    pub fn is_idempotent(&self) -> bool {
        matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }

    /// Endpoint with a single leading slash and the query appended
    pub(crate) fn path_and_query(&self) -> String {
        let mut path = format!("/{}", self.endpoint.trim_start_matches('/'));
        if let Some(query) = &self.query {
            path.push('?');
            path.push_str(query);
        }
        path
    }
}

/// A successful backend response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// JSON body; non-JSON bodies are kept as a string, empty ones as `null`
    pub body: Value,
}

impl ApiResponse {
    pub(crate) fn from_text(status: StatusCode, text: &str) -> Self {
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        };
        Self { status, body }
    }

    /// Decode the body into `T`
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        serde_json::from_value(self.body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}
