//! Forwarding of page data requests to the backend

use crate::error::{DashboardError, ErrorResponse, Result};
use crate::policy::backend_path;
use crate::sessions::CurrentSession;
use crate::state::DashboardState;
use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, Method, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Json, Response},
};
use portico_client::{ApiRequest, ClientError};
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Largest request body relayed to the backend
pub const MAX_FORWARD_BODY: usize = 10 * 1024 * 1024;

/// `ANY /api/{*path}`: call `/{path}` on the backend as the signed-in user.
///
/// Tokens close to expiry are refreshed first. The role check happens
/// before anything is sent. JSON bodies are re-encoded; multipart uploads
/// are relayed byte for byte with their boundary.
#[instrument(name = "dashboard.forward", skip_all, fields(method = %method, path = %path))]
pub async fn forward(
    State(state): State<DashboardState>,
    current: CurrentSession,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let path = backend_path(&path)?;
    let session = current.require()?;
    let (bridge, client) = (session.bridge(), session.client());

    if bridge.needs_refresh() && bridge.refresh_credential().is_some() {
        match client.refresh_session().await {
            Ok(token) => {
                debug!(expires_at = %token.expires_at(), "Refreshed session ahead of expiry");
            }
            Err(e) => warn!(error.code = e.code(), "Opportunistic refresh failed"),
        }
    }

    let token = bridge.current().ok_or(ClientError::Unauthenticated)?;
    state.policy.authorize(&token, &path)?;

    let request = with_body(
        ApiRequest::new(method, path).query(query.unwrap_or_default()),
        &headers,
        body,
    )?;

    let response = client.call_reauthenticating(&request).await?;
    Ok(match response.body {
        Value::Null => response.status.into_response(),
        body => (response.status, Json(body)).into_response(),
    })
}

fn with_body(request: ApiRequest, headers: &HeaderMap, body: Bytes) -> Result<ApiRequest> {
    if body.is_empty() {
        return Ok(request);
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if content_type
        .get(..MULTIPART.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(MULTIPART))
    {
        return Ok(request.raw(content_type, body));
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| DashboardError::BadRequest(format!("request body must be JSON: {e}")))?;
    Ok(request.json(payload))
}

const MULTIPART: &str = "multipart/form-data";

/// Unknown dashboard routes
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "not_found".to_string(),
            message: "No such dashboard route".to_string(),
            retryable: false,
            code: None,
        }),
    )
}
