use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_core::{AuthError, AuthResult, UserId};

/// Identity token claims.
///
/// Field names are part of the wire format: `user_id`, `username`, `role`
/// plus the registered `iat`/`exp`/`iss` claims (seconds since the epoch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: UserId,
    pub username: String,
    pub role: String,

    /// Issued-at, seconds since the epoch.
    pub iat: i64,

    /// Expiration, seconds since the epoch.
    pub exp: i64,

    pub iss: String,
}

impl TokenClaims {
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        role: impl Into<String>,
        issuer: impl Into<String>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> AuthResult<Self> {
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::config("token lifetime overflows the clock"))?;
        Ok(Self {
            user_id,
            username: username.into(),
            role: role.into(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: issuer.into(),
        })
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

impl From<TokenValidationError> for AuthError {
    fn from(err: TokenValidationError) -> Self {
        AuthError::invalid_token(err.to_string())
    }
}

/// Deterministically validate the claim time window.
///
/// Signature verification happens in [`crate::TokenService`]; this only looks
/// at `iat`/`exp` against the supplied clock.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
