//! Sign-in, session and password reset routes

use crate::error::{DashboardError, Result};
use crate::sessions::{BrowserSession, CurrentSession};
use crate::state::DashboardState;
use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Json, Response},
};
use portico_session::{AuthStatus, SessionBridge};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Session state returned by every sign-in route
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub status: AuthStatus,
    /// The token expires soon and should be refreshed
    pub needs_refresh: bool,
}

impl SessionResponse {
    fn of(bridge: &SessionBridge) -> Self {
        Self {
            status: bridge.status(),
            needs_refresh: bridge.needs_refresh(),
        }
    }

    const fn signed_out() -> Self {
        Self {
            status: AuthStatus::Unauthenticated,
            needs_refresh: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email_or_phone")]
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct IdentifierRequest {
    #[serde(alias = "email_or_phone", alias = "email", alias = "phone")]
    pub identifier: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyRequest {
    #[serde(alias = "email_or_phone", alias = "email", alias = "phone")]
    pub identifier: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirmRequest {
    #[serde(alias = "email_or_phone")]
    pub identifier: String,
    pub otp: String,
    pub new_password: String,
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DashboardError::BadRequest(format!("{field} is required")));
    }
    Ok(value)
}

/// Current session status
pub async fn session(current: CurrentSession) -> Json<SessionResponse> {
    Json(match &current.0 {
        Some(session) => SessionResponse::of(session.bridge()),
        None => SessionResponse::signed_out(),
    })
}

/// Register a freshly signed-in session and point the browser at it.
///
/// The browser's previous session, if any, is signed out so a session ID
/// never outlives a sign-in.
async fn establish(
    state: &DashboardState,
    previous: CurrentSession,
    session: BrowserSession,
) -> Response {
    let session = state.sessions.insert(session).await;
    if let Some(previous) = previous.0 {
        state.sessions.remove(previous.id()).await;
    }
    let sessions = state.sessions.authenticated_count().await;
    debug!(sessions, "Browser session established");

    (
        [(SET_COOKIE, state.sessions.cookie(&session))],
        Json(SessionResponse::of(session.bridge())),
    )
        .into_response()
}

#[instrument(name = "dashboard.login", skip_all)]
pub async fn login(
    State(state): State<DashboardState>,
    current: CurrentSession,
    Json(request): Json<LoginRequest>,
) -> Result<Response> {
    let identifier = required("identifier", &request.identifier)?;
    if request.password.is_empty() {
        return Err(DashboardError::BadRequest("password is required".to_string()));
    }

    let session = state.sessions.open();
    session.client().login(identifier, &request.password).await?;
    Ok(establish(&state, current, session).await)
}

#[instrument(name = "dashboard.otp_request", skip_all)]
pub async fn otp_request(
    State(state): State<DashboardState>,
    Json(request): Json<IdentifierRequest>,
) -> Result<Json<Value>> {
    let identifier = required("identifier", &request.identifier)?;
    Ok(Json(state.client.request_otp(identifier).await?))
}

#[instrument(name = "dashboard.otp_verify", skip_all)]
pub async fn otp_verify(
    State(state): State<DashboardState>,
    current: CurrentSession,
    Json(request): Json<OtpVerifyRequest>,
) -> Result<Response> {
    let identifier = required("identifier", &request.identifier)?;
    let otp = required("otp", &request.otp)?;

    let session = state.sessions.open();
    session.client().verify_otp(identifier, otp).await?;
    Ok(establish(&state, current, session).await)
}

#[instrument(name = "dashboard.refresh", skip_all)]
pub async fn refresh(current: CurrentSession) -> Result<Json<SessionResponse>> {
    let session = current.require()?;
    if let Err(e) = session.client().refresh_session().await {
        warn!(error.code = e.code(), "Session refresh failed");
        return Err(e.into());
    }
    Ok(Json(SessionResponse::of(session.bridge())))
}

pub async fn logout(State(state): State<DashboardState>, current: CurrentSession) -> Response {
    if let Some(session) = current.0 {
        state.sessions.remove(session.id()).await;
    }
    (
        [(SET_COOKIE, state.sessions.removal_cookie())],
        Json(SessionResponse::signed_out()),
    )
        .into_response()
}

#[instrument(name = "dashboard.password_reset_request", skip_all)]
pub async fn password_reset_request(
    State(state): State<DashboardState>,
    Json(request): Json<IdentifierRequest>,
) -> Result<Json<Value>> {
    let identifier = required("identifier", &request.identifier)?;
    Ok(Json(state.client.request_password_reset(identifier).await?))
}

#[instrument(name = "dashboard.password_reset_confirm", skip_all)]
pub async fn password_reset_confirm(
    State(state): State<DashboardState>,
    Json(request): Json<PasswordResetConfirmRequest>,
) -> Result<Json<Value>> {
    let identifier = required("identifier", &request.identifier)?;
    let otp = required("otp", &request.otp)?;
    if request.new_password.is_empty() {
        return Err(DashboardError::BadRequest("new_password is required".to_string()));
    }

    Ok(Json(
        state
            .client
            .reset_password(identifier, otp, &request.new_password)
            .await?,
    ))
}
