//! Admin capability resolution.
//!
//! Authentication itself is out of scope: the single studio operator
//! holds a bearer token, and every handler receives a resolved
//! [`Capability`] rather than reaching into ambient session state. Core
//! operations take the capability as an explicit argument.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::convert::Infallible;

use crate::error::AppError;
use crate::state::AppState;

/// What the current caller is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    /// Whether the caller presented the admin token.
    pub is_admin: bool,
    /// Whether any bearer token was presented at all.
    pub token_presented: bool,
}

impl Capability {
    /// Capability of an unauthenticated caller.
    pub fn anonymous() -> Self {
        Self {
            is_admin: false,
            token_presented: false,
        }
    }

    /// Capability of the studio administrator.
    pub fn admin() -> Self {
        Self {
            is_admin: true,
            token_presented: true,
        }
    }

    /// Fails unless the caller holds the admin capability.
    ///
    /// A missing token is Unauthorized (401); a presented-but-wrong token
    /// is Forbidden (403).
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            return Ok(());
        }
        if self.token_presented {
            Err(AppError::Forbidden(
                "administrator capability required".to_string(),
            ))
        } else {
            Err(AppError::Unauthorized(
                "missing bearer token".to_string(),
            ))
        }
    }
}

/// Extracts the bearer token from an Authorization header value.
fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ").map(str::trim)
}

impl FromRequestParts<AppState> for Capability {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token);

        // Public endpoints treat an invalid token as anonymous; admin
        // endpoints reject through require_admin.
        Ok(match token {
            Some(token) if token == state.config.admin_token => Capability::admin(),
            Some(_) => Capability {
                is_admin: false,
                token_presented: true,
            },
            None => Capability::anonymous(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("Bearer  spaced "), Some("spaced"));
        assert_eq!(bearer_token("Basic abc123"), None);
        assert_eq!(bearer_token(""), None);
    }

    #[test]
    fn test_admin_passes_require_admin() {
        assert!(Capability::admin().require_admin().is_ok());
    }

    #[test]
    fn test_anonymous_is_unauthorized() {
        let err = Capability::anonymous().require_admin().unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_wrong_token_is_forbidden() {
        let capability = Capability {
            is_admin: false,
            token_presented: true,
        };
        let err = capability.require_admin().unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
