//! Authorization graph: user → role → permission.

use std::sync::Arc;

use tracing::instrument;

use warden_auth::rbac::{SEED_GRANTS, SEED_PERMISSIONS, SEED_ROLES};
use warden_auth::{Permission, Role, RoleResponse};
use warden_core::{AuthError, AuthResult, PermissionId, RoleId, UserId};

use crate::store::RbacRepository;

/// Queries and mutations over roles, permissions and their associations.
///
/// Permissions reach users only through roles. Assignment, removal and grants
/// are idempotent and rely on the store's uniqueness, not on locking here.
#[derive(Clone)]
pub struct AuthorizationGraph {
    repo: Arc<dyn RbacRepository>,
}

impl AuthorizationGraph {
    pub fn new(repo: Arc<dyn RbacRepository>) -> Self {
        Self { repo }
    }

    pub async fn list_roles(&self) -> AuthResult<Vec<Role>> {
        self.repo.list_roles().await
    }

    pub async fn get_role_by_id(&self, id: RoleId) -> AuthResult<Role> {
        self.repo
            .find_role(id)
            .await?
            .ok_or_else(|| AuthError::not_found("role"))
    }

    pub async fn get_role_by_name(&self, name: &str) -> AuthResult<Role> {
        self.repo
            .find_role_by_name(name)
            .await?
            .ok_or_else(|| AuthError::not_found("role"))
    }

    pub async fn get_permission_by_id(&self, id: PermissionId) -> AuthResult<Permission> {
        self.repo
            .find_permission(id)
            .await?
            .ok_or_else(|| AuthError::not_found("permission"))
    }

    pub async fn list_permissions(&self) -> AuthResult<Vec<Permission>> {
        self.repo.list_permissions().await
    }

    pub async fn permissions_for_role(&self, role_id: RoleId) -> AuthResult<Vec<Permission>> {
        self.repo.permissions_for_role(role_id).await
    }

    pub async fn roles_for_user(&self, user_id: UserId) -> AuthResult<Vec<Role>> {
        self.repo.roles_for_user(user_id).await
    }

    pub async fn permissions_for_user(&self, user_id: UserId) -> AuthResult<Vec<Permission>> {
        self.repo.permissions_for_user(user_id).await
    }

    /// Role listing with each role's permission names attached.
    pub async fn describe_roles(&self, roles: &[Role]) -> AuthResult<Vec<RoleResponse>> {
        let mut out = Vec::with_capacity(roles.len());
        for role in roles {
            let perms = self.repo.permissions_for_role(role.id).await?;
            out.push(RoleResponse::new(role, &perms));
        }
        Ok(out)
    }

    #[instrument(skip(self), err)]
    pub async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> AuthResult<()> {
        self.repo.assign(user_id, role_id).await?;
        tracing::info!(%user_id, %role_id, "role assigned");
        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn remove_role(&self, user_id: UserId, role_id: RoleId) -> AuthResult<()> {
        self.repo.unassign(user_id, role_id).await?;
        tracing::info!(%user_id, %role_id, "role removed");
        Ok(())
    }

    pub async fn has_permission(&self, user_id: UserId, permission: &str) -> AuthResult<bool> {
        self.repo.user_has_permission(user_id, permission).await
    }

    #[instrument(skip(self, description), err)]
    pub async fn create_role(&self, name: &str, description: &str) -> AuthResult<Role> {
        let name = validate_name("name", name, MAX_ROLE_NAME)?;
        self.repo.insert_role(Role::new(name, description)).await
    }

    #[instrument(skip(self, description), err)]
    pub async fn create_permission(&self, name: &str, description: &str) -> AuthResult<Permission> {
        let name = validate_name("name", name, MAX_PERMISSION_NAME)?;
        self.repo
            .insert_permission(Permission::new(name, description))
            .await
    }

    #[instrument(skip(self), err)]
    pub async fn grant_permission(&self, role_id: RoleId, permission_id: PermissionId) -> AuthResult<()> {
        self.get_role_by_id(role_id).await?;
        self.get_permission_by_id(permission_id).await?;
        self.repo.grant(role_id, permission_id).await?;
        tracing::info!(%role_id, %permission_id, "permission granted");
        Ok(())
    }

    /// Ensure the default roles, permissions and grants exist. Safe to run on
    /// every start.
    #[instrument(skip(self), err)]
    pub async fn seed_defaults(&self) -> AuthResult<()> {
        for (name, description) in SEED_ROLES {
            if self.repo.find_role_by_name(name).await?.is_none() {
                ensure_created(self.repo.insert_role(Role::new(*name, *description)).await)?;
            }
        }
        for (name, description) in SEED_PERMISSIONS {
            if self.repo.find_permission_by_name(name).await?.is_none() {
                ensure_created(
                    self.repo
                        .insert_permission(Permission::new(*name, *description))
                        .await,
                )?;
            }
        }
        for (role, permission) in SEED_GRANTS {
            let role = self.get_role_by_name(role).await?;
            let permission = self
                .repo
                .find_permission_by_name(permission)
                .await?
                .ok_or_else(|| AuthError::not_found("permission"))?;
            self.repo.grant(role.id, permission.id).await?;
        }
        tracing::info!(
            roles = SEED_ROLES.len(),
            permissions = SEED_PERMISSIONS.len(),
            "default roles and permissions ensured"
        );
        Ok(())
    }
}

/// Column widths of `roles.name` and `permissions.name`.
const MAX_ROLE_NAME: usize = 50;
const MAX_PERMISSION_NAME: usize = 100;

fn validate_name<'a>(field: &str, name: &'a str, max: usize) -> AuthResult<&'a str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::field(field, "is required"));
    }
    if name.chars().count() > max {
        return Err(AuthError::field(field, format!("must be at most {max} characters")));
    }
    Ok(name)
}

/// A concurrent seeder may win the race; that still leaves the row in place.
fn ensure_created<T>(result: AuthResult<T>) -> AuthResult<()> {
    match result {
        Ok(_) | Err(AuthError::Conflict(_)) => Ok(()),
        Err(e) => Err(e),
    }
}
