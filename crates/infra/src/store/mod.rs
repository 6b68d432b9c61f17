//! Repository boundary.
//!
//! Services talk to storage only through these traits. Two adapters exist:
//! `in_memory` (dev/tests) and `postgres`.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;

use warden_auth::{
    AuditFilter, AuditLogEntry, NewAuditEntry, Pagination, Permission, Role, User,
};
use warden_core::{AuthResult, PermissionId, RoleId, UserId};

pub use in_memory::{InMemoryAuditRepository, InMemoryRbacRepository, InMemoryUserRepository};
pub use postgres::{PostgresAuditRepository, PostgresRbacRepository, PostgresUserRepository};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user. Fails with `Conflict` when the username is taken.
    async fn insert(&self, user: User) -> AuthResult<User>;

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>>;

    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>>;
}

/// Roles, permissions and the two association relations between them.
///
/// Every listing is ordered by name.
#[async_trait]
pub trait RbacRepository: Send + Sync {
    async fn list_roles(&self) -> AuthResult<Vec<Role>>;
    async fn find_role(&self, id: RoleId) -> AuthResult<Option<Role>>;
    async fn find_role_by_name(&self, name: &str) -> AuthResult<Option<Role>>;
    /// Fails with `Conflict` when the name is taken.
    async fn insert_role(&self, role: Role) -> AuthResult<Role>;

    async fn list_permissions(&self) -> AuthResult<Vec<Permission>>;
    async fn find_permission(&self, id: PermissionId) -> AuthResult<Option<Permission>>;
    async fn find_permission_by_name(&self, name: &str) -> AuthResult<Option<Permission>>;
    /// Fails with `Conflict` when the name is taken.
    async fn insert_permission(&self, permission: Permission) -> AuthResult<Permission>;

    async fn permissions_for_role(&self, role_id: RoleId) -> AuthResult<Vec<Permission>>;
    /// Idempotent.
    async fn grant(&self, role_id: RoleId, permission_id: PermissionId) -> AuthResult<()>;

    async fn roles_for_user(&self, user_id: UserId) -> AuthResult<Vec<Role>>;
    /// Distinct permissions reachable through any of the user's roles.
    async fn permissions_for_user(&self, user_id: UserId) -> AuthResult<Vec<Permission>>;
    /// Idempotent.
    async fn assign(&self, user_id: UserId, role_id: RoleId) -> AuthResult<()>;
    /// Idempotent; removing an absent pair succeeds.
    async fn unassign(&self, user_id: UserId, role_id: RoleId) -> AuthResult<()>;
    async fn user_has_permission(&self, user_id: UserId, permission: &str) -> AuthResult<bool>;
}

/// Append-only audit storage.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persist the entry, stamping `created_at` with the store clock if unset.
    async fn append(&self, entry: NewAuditEntry) -> AuthResult<AuditLogEntry>;

    /// Matching entries, newest first, sliced by `page`.
    async fn query(&self, filter: &AuditFilter, page: Pagination) -> AuthResult<Vec<AuditLogEntry>>;
}
