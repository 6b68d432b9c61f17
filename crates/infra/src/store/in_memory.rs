//! In-memory repositories.
//!
//! Intended for tests/dev. Not optimized for performance.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use warden_auth::{
    AuditFilter, AuditLogEntry, NewAuditEntry, Pagination, Permission, Role, RolePermission, User,
    UserRole,
};
use warden_core::{AuditLogId, AuthError, AuthResult, PermissionId, RoleId, UserId};

use super::{AuditRepository, RbacRepository, UserRepository};

fn poisoned(operation: &str) -> AuthError {
    AuthError::storage(operation, "lock poisoned")
}

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: User) -> AuthResult<User> {
        let mut users = self.users.write().map_err(|_| poisoned("insert_user"))?;
        if users.values().any(|u| u.username == user.username) {
            return Err(AuthError::conflict("username already exists"));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let users = self.users.read().map_err(|_| poisoned("find_user_by_username"))?;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>> {
        let users = self.users.read().map_err(|_| poisoned("find_user_by_id"))?;
        Ok(users.get(&id).cloned())
    }
}

#[derive(Debug, Default)]
struct Graph {
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<PermissionId, Permission>,
    role_permissions: Vec<RolePermission>,
    user_roles: Vec<UserRole>,
}

impl Graph {
    fn role_permissions(&self, role_id: RoleId) -> impl Iterator<Item = &Permission> {
        self.role_permissions
            .iter()
            .filter(move |rp| rp.role_id == role_id)
            .filter_map(move |rp| self.permissions.get(&rp.permission_id))
    }

    fn user_roles(&self, user_id: UserId) -> impl Iterator<Item = &Role> {
        self.user_roles
            .iter()
            .filter(move |ur| ur.user_id == user_id)
            .filter_map(move |ur| self.roles.get(&ur.role_id))
    }

    /// Distinct, keyed (and so ordered) by name.
    fn user_permissions(&self, user_id: UserId) -> BTreeMap<&str, &Permission> {
        self.user_roles(user_id)
            .flat_map(|role| self.role_permissions(role.id))
            .map(|p| (p.name.as_str(), p))
            .collect()
    }
}

fn sorted_by_name<T: Clone>(items: impl Iterator<Item = T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    let mut out: Vec<T> = items.collect();
    out.sort_by(|a, b| name(a).cmp(name(b)));
    out
}

/// Role/permission graph held behind a single lock so joins see a consistent
/// snapshot.
#[derive(Debug, Default)]
pub struct InMemoryRbacRepository {
    graph: RwLock<Graph>,
}

impl InMemoryRbacRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RbacRepository for InMemoryRbacRepository {
    async fn list_roles(&self) -> AuthResult<Vec<Role>> {
        let g = self.graph.read().map_err(|_| poisoned("list_roles"))?;
        Ok(sorted_by_name(g.roles.values().cloned(), |r| r.name.as_str()))
    }

    async fn find_role(&self, id: RoleId) -> AuthResult<Option<Role>> {
        let g = self.graph.read().map_err(|_| poisoned("find_role"))?;
        Ok(g.roles.get(&id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> AuthResult<Option<Role>> {
        let g = self.graph.read().map_err(|_| poisoned("find_role_by_name"))?;
        Ok(g.roles.values().find(|r| r.name == name).cloned())
    }

    async fn insert_role(&self, role: Role) -> AuthResult<Role> {
        let mut g = self.graph.write().map_err(|_| poisoned("insert_role"))?;
        if g.roles.values().any(|r| r.name == role.name) {
            return Err(AuthError::conflict(format!("role '{}' already exists", role.name)));
        }
        g.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn list_permissions(&self) -> AuthResult<Vec<Permission>> {
        let g = self.graph.read().map_err(|_| poisoned("list_permissions"))?;
        Ok(sorted_by_name(g.permissions.values().cloned(), |p| p.name.as_str()))
    }

    async fn find_permission(&self, id: PermissionId) -> AuthResult<Option<Permission>> {
        let g = self.graph.read().map_err(|_| poisoned("find_permission"))?;
        Ok(g.permissions.get(&id).cloned())
    }

    async fn find_permission_by_name(&self, name: &str) -> AuthResult<Option<Permission>> {
        let g = self.graph.read().map_err(|_| poisoned("find_permission_by_name"))?;
        Ok(g.permissions.values().find(|p| p.name == name).cloned())
    }

    async fn insert_permission(&self, permission: Permission) -> AuthResult<Permission> {
        let mut g = self.graph.write().map_err(|_| poisoned("insert_permission"))?;
        if g.permissions.values().any(|p| p.name == permission.name) {
            return Err(AuthError::conflict(format!(
                "permission '{}' already exists",
                permission.name
            )));
        }
        g.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn permissions_for_role(&self, role_id: RoleId) -> AuthResult<Vec<Permission>> {
        let g = self.graph.read().map_err(|_| poisoned("permissions_for_role"))?;
        Ok(sorted_by_name(g.role_permissions(role_id).cloned(), |p| p.name.as_str()))
    }

    async fn grant(&self, role_id: RoleId, permission_id: PermissionId) -> AuthResult<()> {
        let mut g = self.graph.write().map_err(|_| poisoned("grant_permission"))?;
        let exists = g
            .role_permissions
            .iter()
            .any(|rp| rp.role_id == role_id && rp.permission_id == permission_id);
        if !exists {
            g.role_permissions.push(RolePermission {
                role_id,
                permission_id,
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn roles_for_user(&self, user_id: UserId) -> AuthResult<Vec<Role>> {
        let g = self.graph.read().map_err(|_| poisoned("roles_for_user"))?;
        Ok(sorted_by_name(g.user_roles(user_id).cloned(), |r| r.name.as_str()))
    }

    async fn permissions_for_user(&self, user_id: UserId) -> AuthResult<Vec<Permission>> {
        let g = self.graph.read().map_err(|_| poisoned("permissions_for_user"))?;
        Ok(g.user_permissions(user_id).into_values().cloned().collect())
    }

    async fn assign(&self, user_id: UserId, role_id: RoleId) -> AuthResult<()> {
        let mut g = self.graph.write().map_err(|_| poisoned("assign_role"))?;
        let exists = g
            .user_roles
            .iter()
            .any(|ur| ur.user_id == user_id && ur.role_id == role_id);
        if !exists {
            g.user_roles.push(UserRole {
                user_id,
                role_id,
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn unassign(&self, user_id: UserId, role_id: RoleId) -> AuthResult<()> {
        let mut g = self.graph.write().map_err(|_| poisoned("remove_role"))?;
        g.user_roles
            .retain(|ur| !(ur.user_id == user_id && ur.role_id == role_id));
        Ok(())
    }

    async fn user_has_permission(&self, user_id: UserId, permission: &str) -> AuthResult<bool> {
        let g = self.graph.read().map_err(|_| poisoned("has_permission"))?;
        Ok(g.user_permissions(user_id).contains_key(permission))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl InMemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append(&self, entry: NewAuditEntry) -> AuthResult<AuditLogEntry> {
        let stored = entry.into_entry(AuditLogId::new(), Utc::now());
        let mut entries = self.entries.write().map_err(|_| poisoned("append_audit"))?;
        entries.push(stored.clone());
        Ok(stored)
    }

    async fn query(&self, filter: &AuditFilter, page: Pagination) -> AuthResult<Vec<AuditLogEntry>> {
        let entries = self.entries.read().map_err(|_| poisoned("query_audit"))?;
        let mut matching: Vec<&AuditLogEntry> = entries.iter().filter(|e| filter.matches(e)).collect();
        // Newest first; ids are UUIDv7 so they break timestamp ties by insertion order.
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matching
            .into_iter()
            .skip(usize::try_from(page.offset).unwrap_or(0))
            .take(usize::try_from(page.limit).unwrap_or(0))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let repo = InMemoryUserRepository::new();
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "x".into(),
            first_name: String::new(),
            last_name: String::new(),
            role: "user".into(),
            active: true,
            created_at: now,
            updated_at: now,
        };
        repo.insert(user.clone()).await.unwrap();

        let dup = User { id: UserId::new(), ..user };
        assert!(matches!(repo.insert(dup).await, Err(AuthError::Conflict(_))));
    }

    #[tokio::test]
    async fn grant_and_assign_are_idempotent() {
        let repo = InMemoryRbacRepository::new();
        let role = repo.insert_role(Role::new("editor", "")).await.unwrap();
        let perm = repo.insert_permission(Permission::new("docs:write", "")).await.unwrap();
        let user = UserId::new();

        repo.grant(role.id, perm.id).await.unwrap();
        repo.grant(role.id, perm.id).await.unwrap();
        repo.assign(user, role.id).await.unwrap();
        repo.assign(user, role.id).await.unwrap();

        assert_eq!(repo.permissions_for_role(role.id).await.unwrap().len(), 1);
        assert_eq!(repo.roles_for_user(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn audit_query_is_newest_first_and_paged() {
        let repo = InMemoryAuditRepository::new();
        for i in 0..5 {
            let mut e = NewAuditEntry::new("GET", "users");
            e.created_at = chrono::DateTime::from_timestamp(1_700_000_000 + i, 0);
            repo.append(e).await.unwrap();
        }

        let page = repo
            .query(&AuditFilter::default(), Pagination::new(Some(2), Some(1)))
            .await
            .unwrap();
        let secs: Vec<i64> = page.iter().map(|e| e.created_at.timestamp()).collect();
        assert_eq!(secs, vec![1_700_000_003, 1_700_000_002]);
    }
}
