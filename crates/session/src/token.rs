//! Verified session tokens and refresh credentials

use crate::claims::{Claims, Role};
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// A session token whose signature has been verified.
///
/// Only [`crate::TokenVerifier`] constructs these, so holding one means
/// the raw string is safe to attach as a bearer credential (subject to
/// expiry). `Debug` never prints the raw token.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    raw: String,
    claims: Claims,
}

impl SessionToken {
    pub(crate) const fn new(raw: String, claims: Claims) -> Self {
        Self { raw, claims }
    }

    /// The encoded token, for the `Authorization` header
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub const fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Opaque subject identifier
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    pub fn role(&self) -> Option<Role> {
        self.claims.role.as_deref().map(Role::parse)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.claims.name.as_deref()
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.claims
            .iat
            .and_then(|iat| DateTime::from_timestamp(iat, 0))
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.claims.exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// `now >= exp`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.claims.exp
    }

    /// Whether the token expires within `window` of `now`
    pub fn expires_within(&self, window: Duration, now: DateTime<Utc>) -> bool {
        let window = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
        now.timestamp().saturating_add(window) >= self.claims.exp
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("sub", &self.claims.sub)
            .field("role", &self.claims.role)
            .field("exp", &self.claims.exp)
            .finish_non_exhaustive()
    }
}

/// Opaque refresh token issued next to the access token at login
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshCredential {
    token: String,
    subject: Option<String>,
}

impl RefreshCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            subject: None,
        }
    }

    /// Record which subject the credential was issued to
    pub(crate) fn bound_to(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    /// The raw refresh token, for the refresh request body only
    pub fn expose(&self) -> &str {
        &self.token
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }
}

impl fmt::Debug for RefreshCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCredential")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}
