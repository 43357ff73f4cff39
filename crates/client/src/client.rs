//! Authenticated backend client

use crate::error::ClientError;
use crate::request::{ApiRequest, ApiResponse, FilePart, Payload};
use crate::retry::RetryPolicy;
use crate::types::ErrorDetail;
use portico_core::BackendSettings;
use portico_session::SessionBridge;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the dashboard backend.
///
/// Protected calls go through [`BackendClient::call`], which attaches the
/// session bridge's current token. Cloning is cheap; clones share the
/// connection pool and the bridge.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
    session: Arc<SessionBridge>,
}

impl BackendClient {
    /// Create a new client builder
    pub fn builder() -> BackendClientBuilder {
        BackendClientBuilder::default()
    }

    pub fn from_settings(
        settings: &BackendSettings,
        session: Arc<SessionBridge>,
    ) -> Result<Self, ClientError> {
        Self::builder()
            .base_url(settings.url.as_str())
            .timeout(settings.timeout)
            .retry(RetryPolicy::from_settings(&settings.retry))
            .user_agent(settings.user_agent.clone())
            .session(session)
            .build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionBridge> {
        &self.session
    }

    /// A client for another session bridge, sharing this one's connection
    /// pool and settings
    #[must_use]
    pub fn for_session(&self, session: Arc<SessionBridge>) -> Self {
        Self {
            session,
            ..self.clone()
        }
    }

    /// Call a protected endpoint with the current session token.
    ///
    /// Fails with [`ClientError::Unauthenticated`] without sending anything
    /// when no token is held. A 401/403 answer clears that token.
    pub async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let token = self.session.current().ok_or(ClientError::Unauthenticated)?;
        let response = self.send(request, Some(token.as_str())).await?;

        let status = response.status();
        if is_auth_failure(status) {
            let detail = read_error(response).await;
            if self.session.clear_if_current(&token) {
                warn!(
                    endpoint = %request.endpoint(),
                    status = status.as_u16(),
                    subject = %token.subject(),
                    "Backend rejected session token"
                );
            }
            return Err(ClientError::AuthRejected {
                status: status.as_u16(),
                message: detail.message,
            });
        }

        finish(request, response).await
    }

    /// [`Self::call`], decoding the body into `T`
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<T, ClientError> {
        self.call(request).await?.json()
    }

    /// [`Self::call`], refreshing the session once when it was rejected.
    ///
    /// A rejected idempotent request is replayed with the new token. A
    /// rejected write is not replayed; the refreshed session is kept and
    /// the rejection is returned.
    pub async fn call_reauthenticating(
        &self,
        request: &ApiRequest,
    ) -> Result<ApiResponse, ClientError> {
        match self.call(request).await {
            Err(ClientError::Unauthenticated) if self.session.refresh_credential().is_some() => {
                self.refresh_session().await?;
                self.call(request).await
            }
            Err(rejected @ ClientError::AuthRejected { .. })
                if self.session.refresh_credential().is_some() =>
            {
                self.refresh_session().await?;
                if request.is_idempotent() {
                    self.call(request).await
                } else {
                    Err(rejected)
                }
            }
            other => other,
        }
    }

    /// Call an endpoint that needs no session (sign-in, OTP, reset).
    ///
    /// 401/403 map to [`ClientError::AuthRejected`] but leave the bridge
    /// untouched.
    pub async fn call_public(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let response = self.send(request, None).await?;
        let status = response.status();
        if is_auth_failure(status) {
            let detail = read_error(response).await;
            return Err(ClientError::AuthRejected {
                status: status.as_u16(),
                message: detail.message,
            });
        }
        finish(request, response).await
    }

    /// Send with retries for idempotent requests
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<Response, ClientError> {
        let url = self.url_for(request)?;
        let attempts = if request.is_idempotent() {
            self.retry.max_attempts()
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            let mut builder = self
                .http
                .request(request.method().clone(), url.clone())
                .timeout(request.timeout_override().unwrap_or(self.timeout));
            if let Some(token) = bearer {
                builder = builder.bearer_auth(token);
            }
            builder = match request.payload() {
                Payload::Empty => builder,
                Payload::Json(body) => builder.json(body),
                Payload::Form(fields) => builder.form(fields),
                Payload::Multipart(parts) => builder.multipart(multipart_form(parts)?),
                Payload::Raw { content_type, body } => builder
                    .header(CONTENT_TYPE, content_type.as_str())
                    .body(body.clone()),
            };

            match builder.send().await {
                Ok(response) => {
                    debug!(
                        method = %request.method(),
                        endpoint = %request.endpoint(),
                        status = response.status().as_u16(),
                        attempt,
                        "Backend responded"
                    );
                    return Ok(response);
                }
                Err(e) if attempt < attempts => {
                    let delay = self.retry.backoff_for(attempt);
                    warn!(
                        method = %request.method(),
                        endpoint = %request.endpoint(),
                        attempt,
                        timed_out = e.is_timeout(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Backend request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        method = %request.method(),
                        endpoint = %request.endpoint(),
                        attempt,
                        timed_out = e.is_timeout(),
                        error = %e,
                        "Backend request failed"
                    );
                    return Err(ClientError::transport(request.endpoint(), e));
                }
            }
        }
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url, ClientError> {
        let raw = format!("{}{}", self.base_url, request.path_and_query());
        Url::parse(&raw).map_err(|e| {
            ClientError::Configuration(format!("invalid endpoint `{}`: {e}", request.endpoint()))
        })
    }
}

async fn finish(request: &ApiRequest, response: Response) -> Result<ApiResponse, ClientError> {
    let status = response.status();
    if status.is_success() {
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::transport(request.endpoint(), e))?;
        return Ok(ApiResponse::from_text(status, &text));
    }

    let detail = read_error(response).await;
    debug!(
        endpoint = %request.endpoint(),
        status = status.as_u16(),
        code = ?detail.code,
        "Backend returned an error"
    );
    Err(ClientError::BackendError {
        status: status.as_u16(),
        code: detail.code,
        message: detail.message,
    })
}

fn multipart_form(parts: &[FilePart]) -> Result<Form, ClientError> {
    parts.iter().try_fold(Form::new(), |form, part| {
        let file = Part::bytes(part.bytes.to_vec())
            .file_name(part.file_name.clone())
            .mime_str(&part.mime)
            .map_err(|e| {
                ClientError::Configuration(format!("invalid content type `{}`: {e}", part.mime))
            })?;
        Ok(form.part(part.field.clone(), file))
    })
}

/// An unreadable error body falls back to the status reason
async fn read_error(response: Response) -> ErrorDetail {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    ErrorDetail::parse(&text, status.canonical_reason().unwrap_or("Request failed"))
}

const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Builder for [`BackendClient`]
#[derive(Default)]
pub struct BackendClientBuilder {
    base_url: Option<String>,
    session: Option<Arc<SessionBridge>>,
    timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
    user_agent: Option<String>,
}

impl BackendClientBuilder {
    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the session bridge supplying bearer tokens
    #[must_use]
    pub fn session(mut self, session: Arc<SessionBridge>) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the default per-request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the retry policy for idempotent requests
    #[must_use]
    pub const fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<BackendClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
        let session = self
            .session
            .ok_or_else(|| ClientError::Configuration("session bridge is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url `{base_url}`: {e}")))?;

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| concat!("portico-client/", env!("CARGO_PKG_VERSION")).to_string());

        let http = ClientBuilder::new()
            .user_agent(user_agent)
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(BackendClient {
            http,
            base_url,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            retry: self.retry.unwrap_or_default(),
            session,
        })
    }
}
