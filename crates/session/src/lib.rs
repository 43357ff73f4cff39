//! Portico session bridge
//!
//! Verifies session tokens issued by the backend against the shared
//! secret and holds the current dashboard session.
//!
//! ```no_run
//! use portico_core::SharedSecret;
//! use portico_session::{SessionBridge, TokenVerifier};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let secret = SharedSecret::new("s1")?;
//! let bridge = SessionBridge::new(TokenVerifier::new(&secret));
//! # let raw = "";
//! let token = bridge.adopt(raw, None)?;
//! println!("signed in as {}", token.subject());
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod claims;
pub mod error;
pub mod token;
pub mod verifier;

pub use bridge::{AuthStatus, DEFAULT_REFRESH_WINDOW, SessionBridge};
pub use claims::{Claims, Role};
pub use error::{Result, SessionError};
pub use token::{RefreshCredential, SessionToken};
pub use verifier::TokenVerifier;
