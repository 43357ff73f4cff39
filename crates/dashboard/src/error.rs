//! Dashboard error types and their JSON rendering

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use portico_client::ClientError;
use portico_session::{Role, SessionError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Everything a dashboard route can fail with
#[derive(Error, Debug)]
pub enum DashboardError {
    /// Backend client failure
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Local token verification failure
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Signed in, but the role may not use this page
    #[error("The `{required}` role is required for {path}")]
    Forbidden { required: Role, path: String },

    /// Malformed request from the browser
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Whether the same request may succeed if retried
    pub retryable: bool,
    /// Machine-readable code reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl DashboardError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Client(e) => client_status(e),
            Self::Session(e) => session_status(e),
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Self::Client(e) => e.code(),
            Self::Session(e) => e.code(),
            Self::Forbidden { .. } => "insufficient_role",
            Self::BadRequest(_) => "bad_request",
        }
    }

    /// Message shown to the user; backend messages are passed through unmodified
    fn message(&self) -> String {
        match self {
            Self::Client(ClientError::BackendError { message, .. }) => message.clone(),
            _ => self.to_string(),
        }
    }
}

fn client_status(error: &ClientError) -> StatusCode {
    match error {
        ClientError::Unauthenticated | ClientError::AuthRejected { .. } => StatusCode::UNAUTHORIZED,
        ClientError::BackendError { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        ClientError::TransportError { timed_out: true, .. } => StatusCode::GATEWAY_TIMEOUT,
        ClientError::TransportError { .. } | ClientError::Decode(_) => StatusCode::BAD_GATEWAY,
        ClientError::Session(e) => session_status(e),
        ClientError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const fn session_status(error: &SessionError) -> StatusCode {
    match error {
        SessionError::InsufficientRole { .. } => StatusCode::FORBIDDEN,
        SessionError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNAUTHORIZED,
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "Request failed");
        }

        let body = ErrorResponse {
            error: self.error_type().to_string(),
            message: self.message(),
            retryable: matches!(&self, Self::Client(e) if e.is_retryable()),
            code: match &self {
                Self::Client(ClientError::BackendError { code, .. }) => code.clone(),
                _ => None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias using DashboardError
pub type Result<T> = std::result::Result<T, DashboardError>;
