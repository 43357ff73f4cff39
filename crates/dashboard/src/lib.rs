//! Portico dashboard server
//!
//! Serves the dashboard's JSON surface: sign-in and session routes backed
//! by one session bridge per browser, and `/api/{*path}` which forwards
//! page data requests to the backend with that browser's session token.

pub mod error;
pub mod policy;
pub mod routes;
pub mod server;
pub mod sessions;
pub mod state;

pub use error::{DashboardError, ErrorResponse};
pub use policy::AccessPolicy;
pub use server::{build_router, serve, shutdown_signal};
pub use sessions::{BrowserSession, CurrentSession, SESSION_COOKIE, SessionStore};
pub use state::DashboardState;
