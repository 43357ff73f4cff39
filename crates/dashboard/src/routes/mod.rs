//! Dashboard route definitions

use crate::state::DashboardState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{any, get, post},
};

pub mod api;
pub mod auth;
pub mod health;

/// All dashboard routes, without middleware
pub fn router() -> Router<DashboardState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/session", get(auth::session))
        .route("/auth/login", post(auth::login))
        .route("/auth/otp/request", post(auth::otp_request))
        .route("/auth/otp/verify", post(auth::otp_verify))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/password-reset/request", post(auth::password_reset_request))
        .route("/auth/password-reset/confirm", post(auth::password_reset_confirm))
        .route(
            "/api/{*path}",
            any(api::forward).layer(DefaultBodyLimit::max(api::MAX_FORWARD_BODY)),
        )
        .fallback(api::not_found)
}
