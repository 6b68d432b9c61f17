use warden_core::{AuthError, AuthResult, UserId};

use crate::Identity;
use crate::rbac::ADMIN_ROLE;

/// Role gate: the caller's token role must be one of `allowed`.
///
/// Pure policy check. No IO, no panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRequirement {
    allowed: Vec<String>,
}

impl RoleRequirement {
    pub fn any_of<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn admin() -> Self {
        Self::any_of([ADMIN_ROLE])
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Missing identity is `Unauthorized`; a role outside the set is `Forbidden`.
    pub fn check(&self, identity: Option<&Identity>) -> AuthResult<()> {
        let identity = identity.ok_or(AuthError::Unauthorized)?;
        if self.allowed.iter().any(|r| *r == identity.role) {
            Ok(())
        } else {
            Err(AuthError::forbidden("insufficient permissions"))
        }
    }
}

/// Callers may read their own records; admins may read anyone's.
pub fn authorize_self_or_admin(identity: &Identity, target: UserId) -> AuthResult<()> {
    if identity.user_id == target || identity.is_admin() {
        Ok(())
    } else {
        Err(AuthError::forbidden("insufficient permissions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: &str) -> Identity {
        Identity {
            user_id: UserId::new(),
            username: "alice".into(),
            role: role.into(),
        }
    }

    #[test]
    fn role_gate_outcomes() {
        let gate = RoleRequirement::any_of(["admin", "auditor"]);
        assert_eq!(gate.check(None), Err(AuthError::Unauthorized));
        assert!(gate.check(Some(&identity("auditor"))).is_ok());
        assert!(matches!(
            gate.check(Some(&identity("user"))),
            Err(AuthError::Forbidden(_))
        ));
    }

    #[test]
    fn role_match_is_exact() {
        let gate = RoleRequirement::admin();
        assert!(gate.check(Some(&identity("Admin"))).is_err());
        assert!(gate.check(Some(&identity("admin"))).is_ok());
    }

    #[test]
    fn self_or_admin() {
        let alice = identity("user");
        assert!(authorize_self_or_admin(&alice, alice.user_id).is_ok());
        assert!(authorize_self_or_admin(&alice, UserId::new()).is_err());
        assert!(authorize_self_or_admin(&identity("admin"), alice.user_id).is_ok());
    }
}
