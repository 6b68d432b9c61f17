use serde::{Deserialize, Serialize};

use warden_core::UserId;

use crate::TokenClaims;
use crate::rbac::ADMIN_ROLE;

/// Identity of an authenticated caller, derived from validated token claims.
///
/// This is what the transport layer attaches to a request once the bearer
/// token checks out; handlers and role gates read it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub role: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
            role: claims.role,
        }
    }
}
