//! Error taxonomy for authentication, authorization and audit operations.

use std::collections::BTreeMap;

use thiserror::Error;

/// Result type used across the workspace.
pub type AuthResult<T> = Result<T, AuthError>;

/// Field name → human readable messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Error returned by token, credential, graph and audit operations.
///
/// Repository errors bubble up unchanged; the HTTP layer owns the final
/// status-code mapping.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Malformed caller input, keyed by field.
    #[error("validation failed")]
    Validation(FieldErrors),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A uniqueness constraint was violated (e.g. duplicate username).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Bad username/password pair. Deliberately carries no detail so unknown
    /// users and wrong passwords are indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Missing, malformed, tampered or expired bearer token.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// No identity is attached to the request.
    #[error("authentication required")]
    Unauthorized,

    /// Identity is known but not allowed (inactive account, insufficient role).
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Process configuration is missing or invalid (e.g. no signing secret).
    #[error("configuration error: {0}")]
    Config(String),

    /// A store round-trip failed; the message carries the operation name.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Single-field validation error.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), vec![message.into()]);
        Self::Validation(fields)
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn storage(operation: &str, cause: impl core::fmt::Display) -> Self {
        Self::Storage(format!("{operation}: {cause}"))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for every variant the HTTP layer answers with 401.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::InvalidToken(_) | Self::Unauthorized
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_builds_single_entry_map() {
        let err = AuthError::field("username", "is required");
        match err {
            AuthError::Validation(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields["username"], vec!["is required".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn storage_message_carries_operation() {
        let err = AuthError::storage("list_roles", "connection reset");
        assert_eq!(err.to_string(), "storage error: list_roles: connection reset");
    }

    #[test]
    fn unauthenticated_variants() {
        assert!(AuthError::InvalidCredentials.is_unauthenticated());
        assert!(AuthError::invalid_token("expired").is_unauthenticated());
        assert!(AuthError::Unauthorized.is_unauthenticated());
        assert!(!AuthError::forbidden("inactive").is_unauthenticated());
    }
}
