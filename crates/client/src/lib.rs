//! Portico backend client
//!
//! Wraps outbound calls to the backend: attaches the current session
//! token, retries idempotent reads on transport failures, and normalizes
//! error responses into [`ClientError`].

pub mod auth;
pub mod client;
pub mod error;
pub mod request;
pub mod retry;
pub mod types;
pub mod uploads;

pub use client::{BackendClient, BackendClientBuilder};
pub use error::ClientError;
pub use request::{ApiRequest, ApiResponse, FilePart, Payload};
pub use retry::RetryPolicy;
pub use types::TokenResponse;
