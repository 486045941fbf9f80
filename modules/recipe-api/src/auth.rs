use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use thiserror::Error;
use tracing::debug;

use recipe_common::{AppConfig, AuthUser};

use crate::error::ApiError;
use crate::AppState;

#[derive(Error, Debug, PartialEq)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Turns a bearer token into a user identity.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// Whether routes demand a verified bearer token. Decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthPolicy {
    pub required: bool,
}

impl AuthPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            required: !config.dev_auth_bypass,
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Identify the caller. With a required policy a missing or bad token is an
/// error; otherwise it makes the request anonymous.
pub fn resolve_user(
    policy: AuthPolicy,
    authenticator: Option<&dyn Authenticator>,
    headers: &HeaderMap,
) -> Result<Option<AuthUser>, AuthError> {
    let verified = match (bearer_token(headers), authenticator) {
        (Some(token), Some(auth)) => auth.authenticate(token).map(Some),
        (Some(_), None) => Err(AuthError::InvalidToken(
            "token verification is not configured".to_string(),
        )),
        (None, _) => Err(AuthError::MissingToken),
    };

    match verified {
        Ok(user) => Ok(user),
        Err(e) if policy.required => Err(e),
        Err(e) => {
            debug!(reason = %e, "Proceeding anonymously");
            Ok(None)
        }
    }
}

/// Caller identity for a request; `None` is an anonymous caller.
/// Rejects with 401 when the policy requires a token and none verifies.
pub struct Caller(pub Option<AuthUser>);

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve_user(state.auth, state.authenticator.as_deref(), &parts.headers)?;
        Ok(Caller(user))
    }
}
