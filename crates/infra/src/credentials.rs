//! Credential store: user records plus password verification.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use warden_auth::user::DEFAULT_ROLE;
use warden_auth::{CredentialHasher, User, UserRegistration, UserResponse};
use warden_core::{AuthError, AuthResult, UserId};

use crate::store::UserRepository;

/// Creates users, looks them up and checks their passwords.
///
/// Hashing runs on the blocking pool so it never stalls request tasks.
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
    default_role: String,
}

impl CredentialStore {
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            users,
            hasher,
            default_role: DEFAULT_ROLE.to_string(),
        }
    }

    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }

    /// Register a new user with the default role, active.
    #[instrument(skip(self, registration), fields(username = %registration.username), err)]
    pub async fn create(&self, registration: &UserRegistration) -> AuthResult<User> {
        registration.check()?;

        if self
            .users
            .find_by_username(&registration.username)
            .await?
            .is_some()
        {
            return Err(AuthError::conflict("username already exists"));
        }

        let password_hash = self.hash(registration.password.clone()).await?;
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            username: registration.username.clone(),
            email: registration.email.clone(),
            password_hash,
            first_name: registration.first_name.clone(),
            last_name: registration.last_name.clone(),
            role: self.default_role.clone(),
            active: true,
            created_at: now,
            updated_at: now,
        };

        // The repository enforces uniqueness too, covering concurrent registrations.
        let user = self.users.insert(user).await?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> AuthResult<User> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AuthError::not_found("user"))
    }

    pub async fn get_by_id(&self, id: UserId) -> AuthResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::not_found("user"))
    }

    /// `true` iff `plaintext` matches the stored hash. Errors collapse to `false`.
    pub async fn verify_password(&self, user: &User, plaintext: &str) -> bool {
        let hasher = Arc::clone(&self.hasher);
        let hash = user.password_hash.clone();
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &plaintext))
            .await
            .unwrap_or(false)
    }

    /// Resolve a username/password pair to an active user.
    ///
    /// Unknown users and wrong passwords both yield `InvalidCredentials`; an
    /// unknown user still pays for one hash verification. A correct password
    /// on an inactive account yields `Forbidden`.
    #[instrument(skip(self, password), err)]
    pub async fn authenticate(&self, username: &str, password: &str) -> AuthResult<User> {
        let Some(user) = self.users.find_by_username(username).await? else {
            let hasher = Arc::clone(&self.hasher);
            let plaintext = password.to_string();
            let _ = tokio::task::spawn_blocking(move || hasher.verify_dummy(&plaintext)).await;
            tracing::warn!("login failed");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_password(&user, password).await {
            tracing::warn!("login failed");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.active {
            tracing::warn!(user_id = %user.id, "login rejected: account inactive");
            return Err(AuthError::forbidden("account is not active"));
        }

        Ok(user)
    }

    pub fn to_public_view(user: &User) -> UserResponse {
        user.to_response()
    }

    async fn hash(&self, plaintext: String) -> AuthResult<String> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AuthError::internal(format!("hashing task failed: {e}")))?
    }
}
