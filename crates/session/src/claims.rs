//! Token claims and dashboard roles

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value;
use std::fmt;

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID); numeric IDs are accepted and kept as text
    #[serde(deserialize_with = "subject_from_string_or_number")]
    pub sub: String,
    /// Expiration time (as UTC timestamp)
    pub exp: i64,
    /// Issued at (as UTC timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Dashboard role, e.g. `admin` or `back_office`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// User's display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

fn subject_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(subject) => Ok(subject),
        Value::Number(subject) => Ok(subject.to_string()),
        other => Err(D::Error::custom(format!(
            "subject must be a string or number, got {other}"
        ))),
    }
}

/// Dashboard roles, ordered `Admin` > `BackOffice` > anything else
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    BackOffice,
    Other(String),
}

impl Role {
    /// Parse a role claim; unknown values are kept verbatim
    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            "back_office" => Self::BackOffice,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::BackOffice => "back_office",
            Self::Other(other) => other,
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Admin => 2,
            Self::BackOffice => 1,
            Self::Other(_) => 0,
        }
    }

    /// Whether a holder of `self` may do what `required` may do
    ///
    /// Unknown roles only satisfy themselves.
    pub fn satisfies(&self, required: &Self) -> bool {
        match required {
            Self::Other(_) => self == required,
            _ => self.rank() >= required.rank(),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
