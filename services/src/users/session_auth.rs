//! Bearer-token authentication for board routes.
//!
//! ```rust,ignore
//! async fn handler(auth: RequireAuth) -> impl IntoResponse {
//!     format!("Hello, {}!", auth.username())
//! }
//! ```
//!
//! The token must be an HS256 JWT signed with `JWT_SECRET`, carrying the
//! username in `sub`, our [`ISSUER`] in `iss` and an unexpired `exp`.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde_json::json;

use super::token::{ISSUER, SessionClaims};
use crate::config::Config;

/// Authenticated caller extracted from a valid session JWT.
///
/// Rejects with [`SessionAuthError`] (401) when the header is missing,
/// malformed, or carries a token that fails validation.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    claims: SessionClaims,
}

impl RequireAuth {
    /// The username from the `sub` claim.
    pub fn username(&self) -> &str {
        &self.claims.sub
    }

    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }

    #[cfg(test)]
    pub fn new_for_test(username: impl Into<String>) -> Self {
        Self {
            claims: SessionClaims::new(username, chrono::Utc::now().timestamp(), 3600),
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionAuthError {
    #[error("Authorization header with Bearer token is required")]
    MissingToken,

    #[error("Authorization header must be in format: Bearer <token>")]
    InvalidFormat,

    #[error("{0}")]
    InvalidToken(String),

    #[error("Server configuration error")]
    MissingConfig,
}

impl SessionAuthError {
    fn code(&self) -> &'static str {
        match self {
            SessionAuthError::MissingToken => "MISSING_TOKEN",
            SessionAuthError::InvalidFormat => "INVALID_FORMAT",
            SessionAuthError::InvalidToken(_) => "INVALID_TOKEN",
            SessionAuthError::MissingConfig => "SERVER_ERROR",
        }
    }
}

impl IntoResponse for SessionAuthError {
    fn into_response(self) -> Response {
        let status = match self {
            SessionAuthError::MissingConfig => {
                tracing::error!("Config extension missing from request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        };
        let body = json!({ "message": self.code(), "detail": self.to_string() });
        (status, Json(body)).into_response()
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header_str = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let stripped = header_str.strip_prefix("Bearer ")?;
    if stripped.is_empty() {
        return None;
    }
    Some(stripped)
}

fn validate_session_token(token: &str, jwt_secret: &str) -> Result<SessionClaims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;

    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => "Token has expired".to_owned(),
        ErrorKind::InvalidSignature => "Invalid token signature".to_owned(),
        ErrorKind::InvalidIssuer => "Invalid token issuer".to_owned(),
        _ => format!("Token validation failed: {e}"),
    })
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = SessionAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Config is attached by an Extension layer in `routes`
        let config = parts
            .extensions
            .get::<Config>()
            .ok_or(SessionAuthError::MissingConfig)?;

        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            if parts.headers.contains_key(AUTHORIZATION) {
                SessionAuthError::InvalidFormat
            } else {
                SessionAuthError::MissingToken
            }
        })?;

        let claims = validate_session_token(token, config.jwt_secret())
            .map_err(SessionAuthError::InvalidToken)?;

        Ok(RequireAuth { claims })
    }
}
