//! User records and the registration/login inputs that create or check them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use warden_core::{AuthError, AuthResult, FieldErrors, UserId};

/// Role assigned to every newly registered user.
pub const DEFAULT_ROLE: &str = "user";

/// A stored user, including the password verifier.
///
/// Never serialize this type to a caller; project it with [`User::to_response`].
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public projection with the password credential stripped.
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role.clone(),
            active: self.active,
            created_at: self.created_at,
        }
    }
}

impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// The user view returned by every API path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Registration input.
///
/// Missing fields deserialize as empty strings so they surface as field-level
/// validation messages instead of body parse failures.
#[derive(Clone, Deserialize, Validate)]
pub struct UserRegistration {
    #[serde(default)]
    #[validate(length(min = 3, max = 50, message = "must be between 3 and 50 characters"))]
    pub username: String,

    #[serde(default)]
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,

    #[serde(default)]
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub last_name: String,
}

impl UserRegistration {
    pub fn check(&self) -> AuthResult<()> {
        self.validate().map_err(into_auth_error)
    }
}

impl core::fmt::Debug for UserRegistration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserRegistration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Login input.
#[derive(Clone, Deserialize, Validate)]
pub struct UserLogin {
    #[serde(default)]
    #[validate(length(min = 1, message = "is required"))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

impl UserLogin {
    pub fn check(&self) -> AuthResult<()> {
        self.validate().map_err(into_auth_error)
    }
}

impl core::fmt::Debug for UserLogin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserLogin")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

fn into_auth_error(errors: ValidationErrors) -> AuthError {
    let mut fields = FieldErrors::new();
    for (field, errs) in errors.field_errors() {
        let messages = errs
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        fields.insert(field.to_string(), messages);
    }
    AuthError::Validation(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(username: &str, email: &str, password: &str) -> UserRegistration {
        UserRegistration {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(registration("alice", "alice@example.com", "wonderland").check().is_ok());
    }

    #[test]
    fn invalid_registration_reports_each_field() {
        let err = registration("al", "not-an-email", "short").check().unwrap_err();
        let AuthError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn missing_fields_deserialize_then_fail_validation() {
        let reg: UserRegistration = serde_json::from_str(r#"{"email":"a@b.co"}"#).unwrap();
        let AuthError::Validation(fields) = reg.check().unwrap_err() else {
            panic!("expected validation error");
        };
        assert_eq!(fields["username"], vec!["must be between 3 and 50 characters".to_string()]);
        assert!(!fields.contains_key("email"));
    }

    #[test]
    fn names_are_limited_to_the_column_width() {
        let mut reg = registration("alice", "alice@example.com", "wonderland");
        reg.first_name = "a".repeat(100);
        reg.last_name = "b".repeat(100);
        assert!(reg.check().is_ok());

        reg.first_name = "a".repeat(101);
        reg.last_name = "b".repeat(101);
        let AuthError::Validation(fields) = reg.check().unwrap_err() else {
            panic!("expected validation error");
        };
        assert_eq!(fields["first_name"], vec!["must be at most 100 characters".to_string()]);
        assert!(fields.contains_key("last_name"));
    }

    #[test]
    fn login_requires_both_fields() {
        let login: UserLogin = serde_json::from_str(r#"{"username":"alice"}"#).unwrap();
        let AuthError::Validation(fields) = login.check().unwrap_err() else {
            panic!("expected validation error");
        };
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["password"]);
    }

    #[test]
    fn public_view_and_debug_never_leak_the_hash() {
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
            role: DEFAULT_ROLE.into(),
            active: true,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&user.to_response()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
        assert!(!format!("{user:?}").contains("argon2"));
    }
}
