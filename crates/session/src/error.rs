//! Session verification errors

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Reasons a token cannot become (or stay) the current session token.
///
/// None of these are fatal to the process. Each one leaves the session
/// unauthenticated and keeps the offending token off the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Signature does not verify under the shared secret
    #[error("token signature does not verify under the shared secret")]
    InvalidSignature,

    /// Token was valid but `now >= exp`
    #[error("token expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    /// Not a decodable token at all
    #[error("token is malformed: {0}")]
    Malformed(String),

    /// Signature verified but required claims are missing or wrong
    #[error("token claims are invalid: {0}")]
    InvalidClaims(String),

    /// Verified identity whose role may not use the dashboard
    #[error("role `{role}` is not permitted to use the dashboard")]
    InsufficientRole { role: String },

    /// Minting failed
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl SessionError {
    /// Stable machine-readable code for the UI layer
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidSignature => "invalid_signature",
            Self::Expired { .. } => "expired",
            Self::Malformed(_) => "malformed_token",
            Self::InvalidClaims(_) => "invalid_claims",
            Self::InsufficientRole { .. } => "insufficient_role",
            Self::Signing(_) => "signing_failed",
        }
    }
}
