//! Signed identity tokens (HMAC JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use warden_core::{AuthError, AuthResult, UserId};

use crate::claims::{TokenClaims, validate_claims};

/// Issuer stamped into every token and required on validation.
pub const DEFAULT_ISSUER: &str = "authservice";

/// Default token lifetime.
pub const DEFAULT_EXPIRATION_HOURS: i64 = 24;

/// Longest accepted token lifetime: one hundred years.
pub const MAX_EXPIRATION_HOURS: i64 = 100 * 366 * 24;

#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub expiration_hours: i64,
    pub issuer: String,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiration_hours: DEFAULT_EXPIRATION_HOURS,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    pub fn with_expiration_hours(mut self, hours: i64) -> Self {
        self.expiration_hours = hours;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

impl core::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("expiration_hours", &self.expiration_hours)
            .field("issuer", &self.issuer)
            .finish()
    }
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and validates identity tokens with a single shared secret.
///
/// Tokens are signed with HS256. Validation accepts any HMAC algorithm and
/// rejects everything else (including `none` and asymmetric algorithms).
pub struct TokenService {
    keys: Option<SigningKeys>,
    expiration_hours: i64,
    issuer: String,
    validation: Validation,
}

impl TokenService {
    /// Build the service. An empty secret leaves it unconfigured: every
    /// `issue`/`validate` call then fails with [`AuthError::Config`].
    pub fn new(config: &TokenConfig) -> Self {
        let keys = (!config.secret.is_empty()).then(|| SigningKeys {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
        });

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        // Time window is checked by `validate_claims` against an explicit clock.
        validation.validate_exp = false;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iat", "iss"]);

        Self {
            keys,
            expiration_hours: config.expiration_hours,
            issuer: config.issuer.clone(),
            validation,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.keys.is_some()
    }

    pub fn expiration_hours(&self) -> i64 {
        self.expiration_hours
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign a token for the given identity, valid for `expiration_hours`.
    pub fn issue(
        &self,
        user_id: UserId,
        username: &str,
        role: &str,
        expiration_hours: i64,
    ) -> AuthResult<String> {
        let ttl = Duration::try_hours(expiration_hours)
            .ok_or_else(|| AuthError::config(format!("token lifetime of {expiration_hours}h is out of range")))?;
        let claims = TokenClaims::new(
            user_id,
            username,
            role,
            self.issuer.as_str(),
            Utc::now(),
            ttl,
        )?;
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &TokenClaims) -> AuthResult<String> {
        let keys = self.keys()?;
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &keys.encoding)
            .map_err(|e| AuthError::internal(format!("token signing failed: {e}")))
    }

    pub fn validate(&self, token: &str) -> AuthResult<TokenClaims> {
        self.validate_at(token, Utc::now())
    }

    /// Verify signature, algorithm and issuer, then check the time window
    /// against `now`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<TokenClaims> {
        let keys = self.keys()?;
        let data = jsonwebtoken::decode::<TokenClaims>(token, &keys.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AuthError::invalid_token(describe(e.kind()))
            })?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }

    fn keys(&self) -> AuthResult<&SigningKeys> {
        self.keys
            .as_ref()
            .ok_or_else(|| AuthError::config("token signing secret is not configured"))
    }
}

fn describe(kind: &ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidSignature => "signature mismatch",
        ErrorKind::InvalidAlgorithm => "unexpected signing algorithm",
        ErrorKind::InvalidIssuer => "unexpected issuer",
        ErrorKind::ExpiredSignature => "token has expired",
        ErrorKind::MissingRequiredClaim(_) => "missing required claim",
        _ => "malformed token",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // {"alg":"none","typ":"JWT"} and {"alg":"RS256","typ":"JWT"}
    const NONE_HEADER: &str = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
    const RS256_HEADER: &str = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9";

    fn service() -> TokenService {
        TokenService::new(&TokenConfig::new("test-secret"))
    }

    fn flip(c: char) -> char {
        if c == 'A' { 'B' } else { 'A' }
    }

    #[test]
    fn issue_then_validate_returns_identical_claims() {
        let svc = service();
        let user_id = UserId::new();
        let token = svc.issue(user_id, "alice", "user", 24).unwrap();

        let claims = svc.validate(&token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.iss, DEFAULT_ISSUER);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service();
        let token = svc.issue(UserId::new(), "alice", "user", 24).unwrap();
        let err = svc.validate_at(&token, Utc::now() + Duration::hours(25)).unwrap_err();
        assert!(err.is_unauthenticated());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let svc = service();
        let token = svc.issue(UserId::new(), "alice", "user", 1).unwrap();
        let header_len = token.find('.').unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;

        for idx in [header_len + 6, sig_start] {
            let mut bytes: Vec<char> = token.chars().collect();
            bytes[idx] = flip(bytes[idx]);
            let tampered: String = bytes.into_iter().collect();
            assert!(svc.validate(&tampered).unwrap_err().is_unauthenticated());
        }
    }

    #[test]
    fn other_secret_or_issuer_is_rejected() {
        let token = service().issue(UserId::new(), "alice", "user", 1).unwrap();

        let other_secret = TokenService::new(&TokenConfig::new("other-secret"));
        assert!(other_secret.validate(&token).unwrap_err().is_unauthenticated());

        let other_issuer = TokenService::new(&TokenConfig::new("test-secret").with_issuer("elsewhere"));
        assert_eq!(
            other_issuer.validate(&token).unwrap_err(),
            AuthError::invalid_token("unexpected issuer")
        );
    }

    #[test]
    fn non_hmac_algorithms_are_rejected() {
        let token = service().issue(UserId::new(), "alice", "admin", 1).unwrap();
        let mut parts = token.split('.');
        let _header = parts.next().unwrap();
        let payload = parts.next().unwrap();
        let signature = parts.next().unwrap();

        let unsigned = format!("{NONE_HEADER}.{payload}.");
        assert!(service().validate(&unsigned).is_err());

        let confused = format!("{RS256_HEADER}.{payload}.{signature}");
        assert!(service().validate(&confused).is_err());
    }

    #[test]
    fn any_hmac_variant_with_the_shared_secret_is_accepted() {
        let svc = service();
        let claims = TokenClaims::new(
            UserId::new(),
            "alice",
            "user",
            DEFAULT_ISSUER,
            Utc::now(),
            Duration::hours(1),
        )
        .unwrap();
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(svc.validate(&token).unwrap(), claims);
    }

    #[test]
    fn missing_secret_is_a_configuration_error() {
        let svc = TokenService::new(&TokenConfig::new(""));
        assert!(!svc.is_configured());
        assert!(matches!(
            svc.issue(UserId::new(), "alice", "user", 1),
            Err(AuthError::Config(_))
        ));
        assert!(matches!(svc.validate("a.b.c"), Err(AuthError::Config(_))));
    }

    #[test]
    fn debug_redacts_secret() {
        let cfg = TokenConfig::new("super-secret");
        assert!(!format!("{cfg:?}").contains("super-secret"));
    }

    #[test]
    fn oversized_lifetime_is_an_error_not_a_panic() {
        let svc = TokenService::new(&TokenConfig::new("s").with_expiration_hours(10_000_000_000));
        for hours in [10_000_000_000, i64::MAX] {
            assert!(matches!(
                svc.issue(UserId::new(), "alice", "user", hours),
                Err(AuthError::Config(_))
            ));
        }
    }
}
