//! Configuration for tracing and instrumentation

use serde::{Deserialize, Serialize};

/// Main instrumentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Service name attached to startup logs
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Log level filter (e.g., "info", "portico=debug")
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            service_name: "portico".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            json: false,
        }
    }
}

impl InstrumentationConfig {
    /// Create configuration for a named service
    ///
    /// `RUST_LOG` takes precedence over `fallback_level`.
    pub fn for_service(service_name: impl Into<String>, fallback_level: &str, json: bool) -> Self {
        Self {
            service_name: service_name.into(),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| fallback_level.to_string()),
            json,
            ..Self::default()
        }
    }
}
