//! The current-session slot shared by the dashboard and the backend client
//!
//! A [`SessionBridge`] holds at most one verified [`SessionToken`]. Readers
//! load it lock-free; every transition (install, clear, sign-out) happens
//! under one mutex and is published on a watch channel so the UI layer sees
//! `Authenticated`/`Unauthenticated` changes as they happen.

use crate::claims::Role;
use crate::error::{Result, SessionError};
use crate::token::{RefreshCredential, SessionToken};
use crate::verifier::TokenVerifier;
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use portico_core::SessionSettings;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Default window before expiry in which a token should be refreshed
pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_secs(300);

/// Authentication state as seen by the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthStatus {
    Unauthenticated,
    Authenticated {
        subject: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        role: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        expires_at: DateTime<Utc>,
    },
}

impl AuthStatus {
    fn for_token(token: &SessionToken) -> Self {
        Self::Authenticated {
            subject: token.subject().to_string(),
            role: token.claims().role.clone(),
            name: token.display_name().map(ToString::to_string),
            expires_at: token.expires_at(),
        }
    }

    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// Holds the current session token and verifies candidates for it
#[derive(Debug)]
pub struct SessionBridge {
    verifier: TokenVerifier,
    allowed_roles: Vec<Role>,
    refresh_window: Duration,
    current: ArcSwapOption<SessionToken>,
    refresh: ArcSwapOption<RefreshCredential>,
    transitions: Mutex<()>,
    status: watch::Sender<AuthStatus>,
}

impl SessionBridge {
    /// Create a bridge with no role restriction
    pub fn new(verifier: TokenVerifier) -> Self {
        let (status, _) = watch::channel(AuthStatus::Unauthenticated);
        Self {
            verifier,
            allowed_roles: Vec::new(),
            refresh_window: DEFAULT_REFRESH_WINDOW,
            current: ArcSwapOption::empty(),
            refresh: ArcSwapOption::empty(),
            transitions: Mutex::new(()),
            status,
        }
    }

    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self::new(TokenVerifier::from_settings(settings))
            .with_allowed_roles(settings.allowed_roles.iter().map(String::as_str).map(Role::parse))
            .with_refresh_window(settings.refresh_window)
    }

    /// Restrict which roles may hold a dashboard session
    ///
    /// An empty set disables the check.
    #[must_use]
    pub fn with_allowed_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.allowed_roles = roles.into_iter().collect();
        self
    }

    #[must_use]
    pub const fn with_refresh_window(mut self, window: Duration) -> Self {
        self.refresh_window = window;
        self
    }

    pub const fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    pub fn allowed_roles(&self) -> &[Role] {
        &self.allowed_roles
    }

    /// Verify a token without touching the current slot
    pub fn verify(&self, raw: &str) -> Result<SessionToken> {
        self.verifier.verify(raw)
    }

    /// Verify `raw`, check its role and make it the current token.
    ///
    /// Any failure leaves the bridge unauthenticated. A fresh refresh
    /// credential replaces the held one; without one, the held credential
    /// is kept only if it was issued to the same subject.
    pub fn adopt(
        &self,
        raw: &str,
        refresh: Option<RefreshCredential>,
    ) -> Result<Arc<SessionToken>> {
        let token = match self.verify(raw).and_then(|t| self.check_role(t)) {
            Ok(token) => token,
            Err(e) => {
                warn!(error.code = e.code(), error = %e, "Rejected session token");
                self.clear_current();
                return Err(e);
            }
        };

        let _guard = self.lock();
        match refresh {
            Some(credential) => {
                let credential = credential.bound_to(token.subject());
                self.refresh.store(Some(Arc::new(credential)));
            }
            None => {
                let same_owner = self
                    .refresh
                    .load()
                    .as_ref()
                    .is_some_and(|held| held.subject() == Some(token.subject()));
                if !same_owner {
                    self.refresh.store(None);
                }
            }
        }
        let token = self.install(token);
        info!(
            subject = %token.subject(),
            role = ?token.claims().role,
            expires_at = %token.expires_at(),
            "Session established"
        );
        Ok(token)
    }

    fn check_role(&self, token: SessionToken) -> Result<SessionToken> {
        if self.allowed_roles.is_empty() {
            return Ok(token);
        }
        let permitted = token
            .role()
            .is_some_and(|role| self.allowed_roles.iter().any(|r| role.satisfies(r)));
        if permitted {
            Ok(token)
        } else {
            Err(SessionError::InsufficientRole {
                role: token.claims().role.clone().unwrap_or_else(|| "none".to_string()),
            })
        }
    }

    /// Replace the held token
    pub fn set_current(&self, token: SessionToken) -> Arc<SessionToken> {
        let _guard = self.lock();
        self.install(token)
    }

    /// Remove the held token. The refresh credential is kept.
    pub fn clear_current(&self) {
        let _guard = self.lock();
        self.remove();
    }

    /// Remove the held token only if it is still `token`.
    ///
    /// Returns whether anything was cleared.
    pub fn clear_if_current(&self, token: &Arc<SessionToken>) -> bool {
        let _guard = self.lock();
        let held = self.current.load();
        match held.as_ref() {
            Some(held) if Arc::ptr_eq(held, token) => {
                self.remove();
                true
            }
            _ => false,
        }
    }

    /// Drop the token and the refresh credential
    pub fn sign_out(&self) {
        let _guard = self.lock();
        self.refresh.store(None);
        self.remove();
        info!("Signed out");
    }

    /// The current token, or `None` once it has expired
    pub fn current(&self) -> Option<Arc<SessionToken>> {
        self.current_at(Utc::now())
    }

    /// Like [`Self::current`], evaluated at `now`
    pub fn current_at(&self, now: DateTime<Utc>) -> Option<Arc<SessionToken>> {
        let token = self.current.load_full()?;
        if token.is_expired_at(now) {
            self.expire(&token);
            return None;
        }
        Some(token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// Status as of now; a token that expired since the last transition
    /// is cleared first
    pub fn status(&self) -> AuthStatus {
        self.expire_stale(Utc::now());
        self.status.borrow().clone()
    }

    /// Receive every status transition
    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.status.subscribe()
    }

    pub fn refresh_credential(&self) -> Option<Arc<RefreshCredential>> {
        self.refresh.load_full()
    }

    pub fn drop_refresh_credential(&self) {
        let _guard = self.lock();
        self.refresh.store(None);
    }

    /// Whether the session should be refreshed now.
    ///
    /// True when the held token expires within the refresh window, or
    /// when no usable token is held but a refresh credential is.
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(Utc::now())
    }

    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        match self.current_at(now) {
            Some(token) => token.expires_within(self.refresh_window, now),
            None => self.refresh.load().is_some(),
        }
    }

    fn expire_stale(&self, now: DateTime<Utc>) {
        if let Some(token) = self.current.load_full().filter(|t| t.is_expired_at(now)) {
            self.expire(&token);
        }
    }

    fn expire(&self, token: &Arc<SessionToken>) {
        if self.clear_if_current(token) {
            debug!(subject = %token.subject(), "Session token expired locally");
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // Callers hold `transitions`
    fn install(&self, token: SessionToken) -> Arc<SessionToken> {
        let token = Arc::new(token);
        self.current.store(Some(Arc::clone(&token)));
        self.status.send_replace(AuthStatus::for_token(&token));
        token
    }

    fn remove(&self) {
        if self.current.swap(None).is_some() {
            self.status.send_replace(AuthStatus::Unauthenticated);
        }
    }
}
