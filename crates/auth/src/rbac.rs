//! Role/permission graph entities.
//!
//! Permissions are only ever granted to roles, and roles to users; there is no
//! direct user→permission edge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{PermissionId, RoleId, UserId};

/// Role whose members pass administrative role gates.
pub const ADMIN_ROLE: &str = "admin";

/// Roles ensured by the default seed: (name, description).
pub const SEED_ROLES: &[(&str, &str)] = &[
    (ADMIN_ROLE, "Full administrative access"),
    (crate::user::DEFAULT_ROLE, "Default role for registered users"),
];

/// Permissions ensured by the default seed: (name, description).
pub const SEED_PERMISSIONS: &[(&str, &str)] = &[
    ("users:read", "Read user profiles and role assignments"),
    ("users:write", "Modify user role assignments"),
    ("roles:read", "List roles and permissions"),
    ("roles:write", "Create roles and grant permissions"),
    ("audit:read", "Query the audit log"),
];

/// Role → permission grants applied by the default seed.
pub const SEED_GRANTS: &[(&str, &str)] = &[
    (ADMIN_ROLE, "users:read"),
    (ADMIN_ROLE, "users:write"),
    (ADMIN_ROLE, "roles:read"),
    (ADMIN_ROLE, "roles:write"),
    (ADMIN_ROLE, "audit:read"),
    (crate::user::DEFAULT_ROLE, "users:read"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RoleId::new(),
            name: name.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PermissionId::new(),
            name: name.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Grant of a permission to a role. At most one row per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
    pub created_at: DateTime<Utc>,
}

/// Assignment of a role to a user. At most one row per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub created_at: DateTime<Utc>,
}

/// Role listing entry with the names of its permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleResponse {
    pub id: RoleId,
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

impl RoleResponse {
    pub fn new(role: &Role, permissions: &[Permission]) -> Self {
        Self {
            id: role.id,
            name: role.name.clone(),
            description: role.description.clone(),
            permissions: permissions.iter().map(|p| p.name.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionResponse {
    pub id: PermissionId,
    pub name: String,
    pub description: String,
}

impl From<&Permission> for PermissionResponse {
    fn from(p: &Permission) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            description: p.description.clone(),
        }
    }
}
