//! Portico core: settings, the shared signing secret and tracing setup

pub mod config;
pub mod error;
pub mod secret;

#[cfg(feature = "tracing")]
pub mod tracing;

pub use config::{BackendSettings, RetrySettings, ServerSettings, SessionSettings, Settings};
pub use error::{ConfigResult, ConfigurationError};
pub use secret::SharedSecret;
