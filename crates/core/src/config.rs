//! Process-wide settings
//!
//! Settings are assembled once at startup from (lowest to highest
//! priority) built-in defaults, an optional configuration file,
//! `PORTICO__SECTION__KEY` environment variables and finally the two
//! launch variables `API_URL` and `JWT_SECRET`. The result is an
//! immutable [`Settings`] value that is handed to the session bridge and
//! the backend client by the caller; nothing here is global.

use crate::error::{ConfigResult, ConfigurationError};
use crate::secret::SharedSecret;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable holding the backend base URL
pub const API_URL_VAR: &str = "API_URL";
/// Environment variable holding the shared signing secret
pub const JWT_SECRET_VAR: &str = "JWT_SECRET";
/// Prefix for structured environment overrides
pub const ENV_PREFIX: &str = "PORTICO";

/// Fully validated dashboard settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Backend connection settings
    pub backend: BackendSettings,
    /// Session verification settings
    pub session: SessionSettings,
    /// Dashboard server settings
    pub server: ServerSettings,
}

/// Where the backend lives and how to talk to it
#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Base URL every endpoint is resolved against
    pub url: Url,
    /// Default timeout for one outbound request
    pub timeout: Duration,
    /// Retry policy for idempotent reads
    pub retry: RetrySettings,
    /// User agent sent with every request
    pub user_agent: String,
}

/// Retry policy for idempotent backend reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

/// Session token verification settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Key shared with the backend
    pub secret: SharedSecret,
    /// Expected `iss` claim, if the backend sets one
    pub issuer: Option<String>,
    /// Roles allowed to sign in to the dashboard; empty allows any role
    pub allowed_roles: Vec<String>,
    /// Tokens expiring within this window are refreshed on the next page request
    pub refresh_window: Duration,
}

/// Dashboard HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address the dashboard listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Log filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,
    /// Mark the session cookie `Secure`; enable when served over HTTPS
    #[serde(default)]
    pub secure_cookie: bool,
}

/// Settings as read from the sources, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawSettings {
    #[serde(default)]
    backend: RawBackend,
    #[serde(default)]
    session: RawSession,
    #[serde(default)]
    server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawBackend {
    #[serde(default)]
    url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    #[serde(default)]
    retry: RetrySettings,
    #[serde(default = "default_user_agent")]
    user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawSession {
    #[serde(default)]
    secret: Option<String>,
    #[serde(default)]
    issuer: Option<String>,
    #[serde(default = "default_allowed_roles")]
    allowed_roles: Vec<String>,
    #[serde(default = "default_refresh_window_secs")]
    refresh_window_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    2_000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("portico/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_allowed_roles() -> Vec<String> {
    vec!["admin".to_string(), "back_office".to_string()]
}

fn default_refresh_window_secs() -> u64 {
    300
}

fn default_bind_addr() -> SocketAddr {
    ([127, 0, 0, 1], 8501).into()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            log_level: default_log_level(),
            log_json: false,
            secure_cookie: false,
        }
    }
}

impl Default for RawBackend {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_timeout_secs(),
            retry: RetrySettings::default(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for RawSession {
    fn default() -> Self {
        Self {
            secret: None,
            issuer: None,
            allowed_roles: default_allowed_roles(),
            refresh_window_secs: default_refresh_window_secs(),
        }
    }
}

impl Settings {
    /// Build settings from a backend URL and secret, defaults elsewhere
    pub fn new(backend_url: &str, secret: impl AsRef<[u8]>) -> ConfigResult<Self> {
        Ok(Self {
            backend: BackendSettings {
                url: parse_backend_url(backend_url)?,
                timeout: Duration::from_secs(default_timeout_secs()),
                retry: RetrySettings::default(),
                user_agent: default_user_agent(),
            },
            session: SessionSettings {
                secret: SharedSecret::new(secret)?,
                issuer: None,
                allowed_roles: default_allowed_roles(),
                refresh_window: Duration::from_secs(default_refresh_window_secs()),
            },
            server: ServerSettings::default(),
        })
    }

    /// Load settings from the process environment and an optional file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if a source cannot be parsed or if the
    /// backend URL or shared secret is absent or empty.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_from(path, std::env::vars().collect())
    }

    /// Load settings from an explicit variable map and an optional file
    pub fn load_from(path: Option<&Path>, vars: HashMap<String, String>) -> ConfigResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&RawSettings {
            backend: RawBackend::default(),
            session: RawSession::default(),
            server: ServerSettings::default(),
        })?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let api_url = vars.get(API_URL_VAR).cloned();
        let secret = vars.get(JWT_SECRET_VAR).cloned();

        builder = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars.into_iter().collect())),
            )
            .set_override_option("backend.url", api_url)?
            .set_override_option("session.secret", secret)?;

        let raw: RawSettings = builder.build()?.try_deserialize()?;
        raw.validate()
    }
}

impl RawSettings {
    fn validate(self) -> ConfigResult<Settings> {
        let url = self
            .backend
            .url
            .as_deref()
            .ok_or(ConfigurationError::MissingBackendUrl)?;
        let secret = self
            .session
            .secret
            .as_deref()
            .ok_or(ConfigurationError::MissingSecret)?;

        if self.backend.retry.max_attempts == 0 {
            return Err(ConfigurationError::invalid(
                "backend.retry.max_attempts must be at least 1",
            ));
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigurationError::invalid(
                "backend.timeout_secs must be greater than zero",
            ));
        }

        Ok(Settings {
            backend: BackendSettings {
                url: parse_backend_url(url)?,
                timeout: Duration::from_secs(self.backend.timeout_secs),
                retry: self.backend.retry,
                user_agent: self.backend.user_agent,
            },
            session: SessionSettings {
                secret: SharedSecret::new(secret)?,
                issuer: self.session.issuer.filter(|issuer| !issuer.trim().is_empty()),
                allowed_roles: self.session.allowed_roles,
                refresh_window: Duration::from_secs(self.session.refresh_window_secs),
            },
            server: self.server,
        })
    }
}

impl RetrySettings {
    /// Delay before the first retry
    pub const fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Upper bound for any single delay
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

fn parse_backend_url(raw: &str) -> ConfigResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigurationError::MissingBackendUrl);
    }

    let url = Url::parse(trimmed).map_err(|e| ConfigurationError::InvalidBackendUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigurationError::InvalidBackendUrl {
            url: trimmed.to_string(),
            reason: format!("unsupported scheme `{}`", url.scheme()),
        });
    }

    Ok(url)
}
