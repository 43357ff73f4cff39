//! Sign-in, one-time passcode, refresh and password reset endpoints

use crate::client::BackendClient;
use crate::error::ClientError;
use crate::request::ApiRequest;
use crate::types::{TokenResponse, otp_identity};
use portico_session::{RefreshCredential, SessionToken};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

impl BackendClient {
    /// Sign in with email or phone and password
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Arc<SessionToken>, ClientError> {
        let request = ApiRequest::post("/auth/login-admin")
            .form([("email_or_phone", identifier), ("password", password)]);
        self.sign_in(&request).await
    }

    /// Ask the backend to send a one-time passcode
    pub async fn request_otp(&self, identifier: &str) -> Result<Value, ClientError> {
        let request =
            ApiRequest::post("/auth/request-otp").json(otp_identity(identifier, None));
        Ok(self.call_public(&request).await?.body)
    }

    /// Sign in with a one-time passcode
    pub async fn verify_otp(
        &self,
        identifier: &str,
        otp: &str,
    ) -> Result<Arc<SessionToken>, ClientError> {
        let request =
            ApiRequest::post("/auth/verify-otp").json(otp_identity(identifier, Some(otp)));
        self.sign_in(&request).await
    }

    /// Exchange the held refresh credential for a new session token.
    ///
    /// The credential is dropped when the backend rejects it.
    pub async fn refresh_session(&self) -> Result<Arc<SessionToken>, ClientError> {
        let credential = self
            .session()
            .refresh_credential()
            .ok_or(ClientError::Unauthenticated)?;
        let request = ApiRequest::post("/auth/refresh-token")
            .json(json!({ "refresh_token": credential.expose() }));

        match self.sign_in(&request).await {
            Err(e @ ClientError::AuthRejected { .. }) => {
                warn!("Refresh credential rejected by backend");
                self.session().drop_refresh_credential();
                Err(e)
            }
            other => other,
        }
    }

    /// Ask for a password reset passcode
    pub async fn request_password_reset(&self, identifier: &str) -> Result<Value, ClientError> {
        let request = ApiRequest::post("/auth/request-password-reset")
            .json(json!({ "email_or_phone": identifier }));
        Ok(self.call_public(&request).await?.body)
    }

    /// Set a new password using a reset passcode
    pub async fn reset_password(
        &self,
        identifier: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<Value, ClientError> {
        let request = ApiRequest::post("/auth/reset-password").json(json!({
            "email_or_phone": identifier,
            "otp": otp,
            "new_password": new_password,
        }));
        Ok(self.call_public(&request).await?.body)
    }

    /// Post to a token-issuing endpoint and adopt the result
    async fn sign_in(&self, request: &ApiRequest) -> Result<Arc<SessionToken>, ClientError> {
        let tokens: TokenResponse = self.call_public(request).await?.json()?;
        let refresh = tokens.refresh_token.map(RefreshCredential::new);
        let token = self.session().adopt(&tokens.access_token, refresh)?;
        info!(
            endpoint = %request.endpoint(),
            subject = %token.subject(),
            "Signed in"
        );
        Ok(token)
    }
}
