//! Local verification (and symmetric minting) of session tokens

use crate::claims::{Claims, Role};
use crate::error::{Result, SessionError};
use crate::token::SessionToken;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use portico_core::{SessionSettings, SharedSecret};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Verifies HS256 session tokens against the shared secret.
///
/// Verification is purely local; no backend round trip is involved.
#[derive(Clone)]
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
    fingerprint: String,
}

impl TokenVerifier {
    /// Create a verifier for the given secret
    pub fn new(secret: &SharedSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `verify_at` with `now >= exp`, without leeway
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer: None,
            fingerprint: secret.fingerprint(),
        }
    }

    /// Create a verifier from session settings
    pub fn from_settings(settings: &SessionSettings) -> Self {
        let verifier = Self::new(&settings.secret);
        match &settings.issuer {
            Some(issuer) => verifier.with_issuer(issuer.clone()),
            None => verifier,
        }
    }

    /// Require (and stamp minted tokens with) an issuer
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();
        self.validation.set_issuer(std::slice::from_ref(&issuer));
        self.issuer = Some(issuer);
        self
    }

    /// Fingerprint of the secret this verifier uses
    pub fn secret_fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Verify a token against the current time
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidSignature`] if the signature does not verify,
    /// [`SessionError::Expired`] if it does but `now >= exp`.
    pub fn verify(&self, raw: &str) -> Result<SessionToken> {
        self.verify_at(raw, Utc::now())
    }

    /// Verify a token as of `now`
    ///
    /// The signature is checked before expiry, so a token signed with a
    /// different secret is reported as `InvalidSignature` even if expired.
    pub fn verify_at(&self, raw: &str, now: DateTime<Utc>) -> Result<SessionToken> {
        let raw = raw.trim();
        let data = decode::<Value>(raw, &self.decoding_key, &self.validation)
            .map_err(classify_error)?;
        // Signature already verified; anything wrong from here on is the claims
        let claims = serde_json::from_value::<Claims>(data.claims)
            .map_err(|e| SessionError::InvalidClaims(e.to_string()))?;

        let token = SessionToken::new(raw.to_string(), claims);
        if token.is_expired_at(now) {
            return Err(SessionError::Expired {
                expired_at: token.expires_at(),
            });
        }

        Ok(token)
    }

    /// Mint a token for `subject` valid for `ttl`
    pub fn mint(
        &self,
        subject: &str,
        role: Option<&Role>,
        name: Option<&str>,
        ttl: Duration,
    ) -> Result<SessionToken> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(ttl.as_secs())
            .map_err(|_| SessionError::Signing("token lifetime out of range".to_string()))?;

        self.mint_claims(Claims {
            sub: subject.to_string(),
            exp: now.saturating_add(ttl),
            iat: Some(now),
            role: role.map(|r| r.as_str().to_string()),
            name: name.map(ToString::to_string),
            iss: self.issuer.clone(),
        })
    }

    /// Sign arbitrary claims
    pub fn mint_claims(&self, claims: Claims) -> Result<SessionToken> {
        let raw = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| SessionError::Signing(e.to_string()))?;
        Ok(SessionToken::new(raw, claims))
    }
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithm", &Algorithm::HS256)
            .field("issuer", &self.issuer)
            .field("secret", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

fn classify_error(error: jsonwebtoken::errors::Error) -> SessionError {
    match error.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::InvalidKeyFormat => SessionError::InvalidSignature,
        ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidSubject
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_) => SessionError::InvalidClaims(error.to_string()),
        _ => SessionError::Malformed(error.to_string()),
    }
}
