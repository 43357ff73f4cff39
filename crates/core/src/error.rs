//! Startup configuration errors

/// Standard result type for configuration loading
pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;

/// Errors raised while assembling process-wide settings.
///
/// Every variant is fatal: the dashboard cannot verify or attach session
/// tokens without a secret and a backend address, so startup halts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("shared signing secret is missing or empty (set JWT_SECRET)")]
    MissingSecret,

    #[error("backend base URL is missing or empty (set API_URL)")]
    MissingBackendUrl,

    #[error("backend base URL `{url}` is invalid: {reason}")]
    InvalidBackendUrl { url: String, reason: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },

    #[error("failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
}

impl ConfigurationError {
    /// Create an invalid configuration error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}
