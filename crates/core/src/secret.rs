//! Shared signing secret
//!
//! The secret is loaded once at startup and then only read. It never
//! appears in `Debug` or `Display` output; logs identify it by a short
//! SHA-256 fingerprint so operators can compare the dashboard's secret
//! with the backend's without exposing either.

use crate::error::ConfigurationError;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Number of hex characters shown by [`SharedSecret::fingerprint`]
const FINGERPRINT_LEN: usize = 8;

/// Symmetric key shared by the backend (signer) and the dashboard (verifier)
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(Arc<[u8]>);

impl SharedSecret {
    /// Wrap a secret, rejecting empty or whitespace-only values
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, ConfigurationError> {
        let bytes = secret.as_ref();
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ConfigurationError::MissingSecret);
        }
        Ok(Self(Arc::from(bytes)))
    }

    /// Raw key material for signing and verification
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the key in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; empty secrets cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First hex characters of the SHA-256 digest of the key
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.0);
        let mut encoded = hex::encode(digest);
        encoded.truncate(FINGERPRINT_LEN);
        encoded
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecret")
            .field("len", &self.len())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

impl fmt::Display for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_secret() {
        assert!(matches!(
            SharedSecret::new(""),
            Err(ConfigurationError::MissingSecret)
        ));
        assert!(matches!(
            SharedSecret::new("  \n"),
            Err(ConfigurationError::MissingSecret)
        ));
    }

    #[test]
    fn test_debug_and_display_redact_key() {
        let secret = SharedSecret::new("super-secret-signing-key").unwrap();

        let debug = format!("{secret:?}");
        let display = secret.to_string();

        assert!(!debug.contains("super-secret"));
        assert!(!display.contains("super-secret"));
        assert!(debug.contains(&secret.fingerprint()));
        assert_eq!(display, format!("sha256:{}", secret.fingerprint()));
        assert!(display.is_ascii());
    }

    #[test]
    fn test_fingerprint_is_stable_and_distinguishes_secrets() {
        let a = SharedSecret::new("s1").unwrap();
        let b = SharedSecret::new("s1").unwrap();
        let c = SharedSecret::new("s2").unwrap();

        assert_eq!(a.fingerprint().len(), 8);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a, b);
    }
}
