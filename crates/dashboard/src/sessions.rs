//! Browser sessions
//!
//! Every signed-in browser gets its own [`SessionBridge`], found through
//! the `portico_session` cookie. A caller without a known cookie has no
//! token at all; nothing signed in by one browser is visible to another.

use crate::error::DashboardError;
use crate::state::DashboardState;
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header::COOKIE, request::Parts};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use cookie::{Cookie, SameSite};
use portico_client::{BackendClient, ClientError};
use portico_core::SessionSettings;
use portico_session::SessionBridge;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Name of the cookie carrying the session ID
pub const SESSION_COOKIE: &str = "portico_session";

/// One browser's token slot and a backend client bound to it
#[derive(Debug)]
pub struct BrowserSession {
    id: String,
    client: BackendClient,
}

impl BrowserSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn client(&self) -> &BackendClient {
        &self.client
    }

    pub fn bridge(&self) -> &Arc<SessionBridge> {
        self.client.session()
    }

    /// Holds a usable token, or a credential to get one
    fn is_live(&self) -> bool {
        self.bridge().is_authenticated() || self.bridge().refresh_credential().is_some()
    }
}

/// Browser sessions keyed by session ID
#[derive(Debug)]
pub struct SessionStore {
    settings: SessionSettings,
    client: BackendClient,
    secure_cookie: bool,
    sessions: RwLock<HashMap<String, Arc<BrowserSession>>>,
}

impl SessionStore {
    /// `client` is cloned onto a fresh bridge for every session
    pub fn new(settings: SessionSettings, client: BackendClient) -> Self {
        Self {
            settings,
            client,
            secure_cookie: false,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }

    /// Generate a new session ID
    pub fn generate_session_id() -> String {
        let random_bytes: [u8; 32] = rand::random();
        URL_SAFE_NO_PAD.encode(random_bytes)
    }

    /// A new, unregistered session to sign in with.
    ///
    /// It becomes reachable through its cookie only after [`Self::insert`].
    pub fn open(&self) -> BrowserSession {
        let bridge = Arc::new(SessionBridge::from_settings(&self.settings));
        BrowserSession {
            id: Self::generate_session_id(),
            client: self.client.for_session(bridge),
        }
    }

    /// Register a signed-in session, dropping sessions that have lapsed
    pub async fn insert(&self, session: BrowserSession) -> Arc<BrowserSession> {
        let session = Arc::new(session);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, held| held.is_live());
        if sessions.len() < before {
            debug!(pruned = before - sessions.len(), "Dropped lapsed sessions");
        }
        sessions.insert(session.id.clone(), Arc::clone(&session));
        session
    }

    pub async fn get(&self, id: &str) -> Option<Arc<BrowserSession>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Sign the session out and forget it
    pub async fn remove(&self, id: &str) -> Option<Arc<BrowserSession>> {
        let removed = self.sessions.write().await.remove(id);
        if let Some(session) = &removed {
            session.bridge().sign_out();
        }
        removed
    }

    /// Number of sessions currently holding a usable token
    pub async fn authenticated_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|session| session.bridge().is_authenticated())
            .count()
    }

    /// `Set-Cookie` value binding the browser to `session`
    pub fn cookie(&self, session: &BrowserSession) -> String {
        self.cookie_builder(session.id.clone()).build().to_string()
    }

    /// `Set-Cookie` value that removes the session cookie
    pub fn removal_cookie(&self) -> String {
        let mut cookie = self.cookie_builder(String::new()).build();
        cookie.make_removal();
        cookie.to_string()
    }

    fn cookie_builder(&self, value: String) -> cookie::CookieBuilder<'static> {
        Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure_cookie)
    }
}

/// Session ID from the request's `Cookie` headers
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// The caller's browser session, if its cookie names a registered one
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<Arc<BrowserSession>>);

impl CurrentSession {
    /// The session, or `Unauthenticated`
    pub fn require(self) -> Result<Arc<BrowserSession>, DashboardError> {
        self.0.ok_or(DashboardError::Client(ClientError::Unauthenticated))
    }
}

impl FromRequestParts<DashboardState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &DashboardState,
    ) -> Result<Self, Self::Rejection> {
        let session = match session_id(&parts.headers) {
            Some(id) => state.sessions.get(&id).await,
            None => None,
        };
        Ok(Self(session))
    }
}
