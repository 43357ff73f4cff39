//! Liveness of the dashboard process

use crate::state::DashboardState;
use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Backend every page request is forwarded to
    pub backend: String,
    /// Browser sessions currently holding a usable token
    pub active_sessions: usize,
    pub timestamp: DateTime<Utc>,
}

/// Always 200 while the process is serving; never contacts the backend
pub async fn health_check(State(state): State<DashboardState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.client.base_url().to_string(),
        active_sessions: state.sessions.authenticated_count().await,
        timestamp: Utc::now(),
    })
}
