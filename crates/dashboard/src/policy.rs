//! Which role each backend area requires

use crate::error::DashboardError;
use portico_session::{Role, SessionToken};

/// Role requirements for forwarded backend paths.
///
/// Rules match whole path segments; the longest matching prefix wins and
/// unmatched paths fall back to the default role.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<(String, Role)>,
    default: Role,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(Role::BackOffice).with_rule("admin/users", Role::Admin)
    }
}

impl AccessPolicy {
    pub const fn new(default: Role) -> Self {
        Self {
            rules: Vec::new(),
            default,
        }
    }

    #[must_use]
    pub fn with_rule(mut self, prefix: &str, role: Role) -> Self {
        self.rules.push((normalize(prefix).to_string(), role));
        self
    }

    /// Role needed to reach `path`
    pub fn required_role(&self, path: &str) -> &Role {
        let path = normalize(path);
        self.rules
            .iter()
            .filter(|(prefix, _)| {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(&self.default, |(_, role)| role)
    }

    /// Check that `token` may reach `path`
    pub fn authorize(&self, token: &SessionToken, path: &str) -> Result<(), DashboardError> {
        let required = self.required_role(path);
        let permitted = token.role().is_some_and(|role| role.satisfies(required));
        if permitted {
            Ok(())
        } else {
            Err(DashboardError::Forbidden {
                required: required.clone(),
                path: normalize(path).to_string(),
            })
        }
    }
}

fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

/// Canonical form of a forwarded path, or `BadRequest`.
///
/// The result is exactly what reaches the backend: no empty, `.` or `..`
/// segments and nothing a URL parser would reinterpret, so the role
/// checked is the role of the endpoint actually called.
pub fn backend_path(path: &str) -> Result<String, DashboardError> {
    let trimmed = normalize(path);
    if trimmed.is_empty() {
        return Err(DashboardError::BadRequest("empty backend path".to_string()));
    }

    for segment in trimmed.split('/') {
        let reinterpreted = segment.is_empty()
            || segment == "."
            || segment == ".."
            || segment
                .chars()
                .any(|c| matches!(c, '?' | '#' | '%' | '\\') || c.is_control());
        if reinterpreted {
            return Err(DashboardError::BadRequest(format!(
                "unsupported backend path `{trimmed}`"
            )));
        }
    }
    Ok(trimmed.to_string())
}
