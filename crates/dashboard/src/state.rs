//! Application state management

use crate::policy::AccessPolicy;
use crate::sessions::SessionStore;
use portico_client::{BackendClient, ClientError};
use portico_core::Settings;
use portico_session::SessionBridge;
use std::sync::Arc;

/// Shared state handed to every route
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// Signed-in browser sessions
    pub sessions: Arc<SessionStore>,
    /// Client for endpoints that need no session (OTP, password reset).
    /// Its own bridge never holds a token.
    pub client: BackendClient,
    /// Role requirements for forwarded requests
    pub policy: Arc<AccessPolicy>,
}

impl DashboardState {
    pub fn new(client: BackendClient, sessions: SessionStore, policy: AccessPolicy) -> Self {
        Self {
            sessions: Arc::new(sessions),
            client,
            policy: Arc::new(policy),
        }
    }

    /// Build the session store and the client from validated settings
    pub fn from_settings(settings: &Settings) -> Result<Self, ClientError> {
        let unbound = Arc::new(SessionBridge::from_settings(&settings.session));
        let client = BackendClient::from_settings(&settings.backend, unbound)?;
        let sessions = SessionStore::new(settings.session.clone(), client.clone())
            .with_secure_cookie(settings.server.secure_cookie);
        Ok(Self::new(client, sessions, AccessPolicy::default()))
    }
}
