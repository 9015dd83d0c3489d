//! Session token claims and issuing.

use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Issuer name embedded in every session token.
pub const ISSUER: &str = "Weterest";

/// Session lifetime in seconds.
pub const SESSION_TTL_SECS: i64 = 60 * 60 * 24;

/// Claims carried by a session JWT. `sub` is the username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl SessionClaims {
    pub fn new(username: impl Into<String>, issued_at: i64, ttl_secs: i64) -> Self {
        Self {
            sub: username.into(),
            iat: issued_at,
            exp: issued_at + ttl_secs,
            iss: ISSUER.to_owned(),
        }
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Signs an HS256 session token for `username`.
pub fn generate_session_token(
    username: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    sign_claims(&SessionClaims::new(username, now_secs(), SESSION_TTL_SECS), secret)
}

/// Signs arbitrary claims. Tests use this to mint expired or foreign tokens.
pub fn sign_claims(
    claims: &SessionClaims,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
