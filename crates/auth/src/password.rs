//! Password hashing.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use warden_core::{AuthError, AuthResult};

/// One-way credential hashing.
pub trait CredentialHasher: Send + Sync {
    /// Produce a salted, self-describing hash of `plaintext`.
    fn hash(&self, plaintext: &str) -> AuthResult<String>;

    /// `true` iff `plaintext` matches `hash`. Malformed hashes never match.
    fn verify(&self, hash: &str, plaintext: &str) -> bool;

    /// Spend roughly one verification's worth of work on a throwaway hash.
    ///
    /// Called when a login names an unknown user so its latency matches a
    /// wrong-password attempt.
    fn verify_dummy(&self, _plaintext: &str) {}
}

/// Argon2id hasher producing PHC strings.
pub struct Argon2Hasher {
    params: Params,
    dummy: OnceLock<Option<String>>,
}

impl Argon2Hasher {
    /// Hasher with the library's recommended parameters.
    pub fn new() -> Self {
        Self {
            params: Params::default(),
            dummy: OnceLock::new(),
        }
    }

    /// Hasher with explicit cost parameters (memory in KiB, iterations, lanes).
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> AuthResult<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AuthError::config(format!("invalid argon2 parameters: {e}")))?;
        Ok(Self {
            params,
            dummy: OnceLock::new(),
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Argon2Hasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Argon2Hasher")
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .field("p_cost", &self.params.p_cost())
            .finish()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))
    }

    fn verify(&self, hash: &str, plaintext: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            tracing::warn!("stored password hash is not a valid PHC string");
            return false;
        };
        self.argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    fn verify_dummy(&self, plaintext: &str) {
        let dummy = self
            .dummy
            .get_or_init(|| self.hash("warden-dummy-credential").ok());
        if let Some(hash) = dummy {
            let _ = self.verify(hash, plaintext);
        }
    }
}
