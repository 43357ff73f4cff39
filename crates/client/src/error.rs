//! Client error types

use portico_session::SessionError;
use thiserror::Error;

/// Errors surfaced by [`crate::BackendClient`]
#[derive(Debug, Error)]
pub enum ClientError {
    /// No current session token; nothing was sent
    #[error("Not signed in")]
    Unauthenticated,

    /// Backend answered 401/403
    #[error("Backend rejected the session ({status}): {message}")]
    AuthRejected { status: u16, message: String },

    /// Any other non-success response, as the backend reported it
    #[error("Backend error {status}: {message}")]
    BackendError {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The backend could not be reached or did not answer in time
    #[error("Request to {endpoint} failed: {source}")]
    TransportError {
        endpoint: String,
        timed_out: bool,
        #[source]
        source: reqwest::Error,
    },

    /// A token returned by the backend failed local verification
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Response body did not have the expected shape
    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    pub(crate) fn transport(endpoint: &str, source: reqwest::Error) -> Self {
        Self::TransportError {
            endpoint: endpoint.to_string(),
            timed_out: source.is_timeout(),
            source,
        }
    }

    /// Whether the user has to sign in (again) before retrying
    pub const fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated | Self::AuthRejected { .. } | Self::Session(_)
        )
    }

    /// Whether retrying the same call later may succeed
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportError { .. })
    }

    /// Stable machine-readable code
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::AuthRejected { .. } => "auth_rejected",
            Self::BackendError { .. } => "backend_error",
            Self::TransportError { timed_out: true, .. } => "backend_timeout",
            Self::TransportError { .. } => "backend_unreachable",
            Self::Session(e) => e.code(),
            Self::Decode(_) => "decode_error",
            Self::Configuration(_) => "configuration_error",
        }
    }
}
