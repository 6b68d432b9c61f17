//! PostgreSQL repositories.
//!
//! Rows are mapped by hand with `try_get`; every statement uses bound
//! parameters. Driver errors go through [`map_sqlx_error`] so callers only
//! ever see the domain taxonomy.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;
use uuid::Uuid;

use warden_auth::{
    AuditFilter, AuditLogEntry, NewAuditEntry, Pagination, Permission, Role, User,
};
use warden_core::{AuditLogId, AuthError, AuthResult, PermissionId, RoleId, UserId};

use super::{AuditRepository, RbacRepository, UserRepository};
use crate::db::map_sqlx_error;

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, role, active, created_at, updated_at";
const ROLE_COLUMNS: &str = "r.id, r.name, r.description, r.created_at, r.updated_at";
const PERMISSION_COLUMNS: &str = "p.id, p.name, p.description, p.created_at, p.updated_at";
const AUDIT_COLUMNS: &str = "id, user_id, action, resource_type, resource_id, ip_address, user_agent, details, created_at";

fn decode<T>(operation: &str, row: &PgRow, f: fn(&PgRow) -> Result<T, sqlx::Error>) -> AuthResult<T> {
    f(row).map_err(|e| AuthError::storage(operation, format!("failed to decode row: {e}")))
}

fn decode_all<T>(
    operation: &str,
    rows: &[PgRow],
    f: fn(&PgRow) -> Result<T, sqlx::Error>,
) -> AuthResult<Vec<T>> {
    rows.iter().map(|row| decode(operation, row, f)).collect()
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        role: row.try_get("role")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn role_from_row(row: &PgRow) -> Result<Role, sqlx::Error> {
    Ok(Role {
        id: RoleId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn permission_from_row(row: &PgRow) -> Result<Permission, sqlx::Error> {
    Ok(Permission {
        id: PermissionId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn audit_from_row(row: &PgRow) -> Result<AuditLogEntry, sqlx::Error> {
    let user_id: Option<Uuid> = row.try_get("user_id")?;
    Ok(AuditLogEntry {
        id: AuditLogId::from_uuid(row.try_get("id")?),
        user_id: user_id.map(UserId::from_uuid),
        action: row.try_get("action")?,
        resource_type: row.try_get("resource_type")?,
        resource_id: row.try_get("resource_id")?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
        details: row.try_get("details")?,
        created_at: row.try_get("created_at")?,
    })
}

#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert(&self, user: User) -> AuthResult<User> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::from(user.id))
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.role)
            .bind(user.active)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match map_sqlx_error("insert_user", e) {
                AuthError::Conflict(_) => AuthError::conflict("username already exists"),
                other => other,
            })?;
        decode("insert_user", &row, user_from_row)
    }

    #[instrument(skip(self), err)]
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_username", e))?;
        row.map(|r| decode("find_user_by_username", &r, user_from_row))
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_id", e))?;
        row.map(|r| decode("find_user_by_id", &r, user_from_row))
            .transpose()
    }
}

#[derive(Debug, Clone)]
pub struct PostgresRbacRepository {
    pool: PgPool,
}

impl PostgresRbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_roles(&self, operation: &str, sql: &str, bind: Option<Uuid>) -> AuthResult<Vec<Role>> {
        let mut query = sqlx::query(sql);
        if let Some(id) = bind {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        decode_all(operation, &rows, role_from_row)
    }

    async fn fetch_permissions(
        &self,
        operation: &str,
        sql: &str,
        bind: Option<Uuid>,
    ) -> AuthResult<Vec<Permission>> {
        let mut query = sqlx::query(sql);
        if let Some(id) = bind {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        decode_all(operation, &rows, permission_from_row)
    }
}

#[async_trait]
impl RbacRepository for PostgresRbacRepository {
    #[instrument(skip(self), err)]
    async fn list_roles(&self) -> AuthResult<Vec<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles r ORDER BY r.name");
        self.fetch_roles("list_roles", &sql, None).await
    }

    #[instrument(skip(self), err)]
    async fn find_role(&self, id: RoleId) -> AuthResult<Option<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles r WHERE r.id = $1");
        let row = sqlx::query(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_role", e))?;
        row.map(|r| decode("find_role", &r, role_from_row)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_role_by_name(&self, name: &str) -> AuthResult<Option<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles r WHERE r.name = $1");
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_role_by_name", e))?;
        row.map(|r| decode("find_role_by_name", &r, role_from_row))
            .transpose()
    }

    #[instrument(skip(self, role), fields(name = %role.name), err)]
    async fn insert_role(&self, role: Role) -> AuthResult<Role> {
        sqlx::query(
            "INSERT INTO roles (id, name, description, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::from(role.id))
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_role", e))?;
        Ok(role)
    }

    #[instrument(skip(self), err)]
    async fn list_permissions(&self) -> AuthResult<Vec<Permission>> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions p ORDER BY p.name");
        self.fetch_permissions("list_permissions", &sql, None).await
    }

    #[instrument(skip(self), err)]
    async fn find_permission(&self, id: PermissionId) -> AuthResult<Option<Permission>> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions p WHERE p.id = $1");
        let row = sqlx::query(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_permission", e))?;
        row.map(|r| decode("find_permission", &r, permission_from_row))
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_permission_by_name(&self, name: &str) -> AuthResult<Option<Permission>> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions p WHERE p.name = $1");
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_permission_by_name", e))?;
        row.map(|r| decode("find_permission_by_name", &r, permission_from_row))
            .transpose()
    }

    #[instrument(skip(self, permission), fields(name = %permission.name), err)]
    async fn insert_permission(&self, permission: Permission) -> AuthResult<Permission> {
        sqlx::query(
            "INSERT INTO permissions (id, name, description, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::from(permission.id))
        .bind(&permission.name)
        .bind(&permission.description)
        .bind(permission.created_at)
        .bind(permission.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_permission", e))?;
        Ok(permission)
    }

    #[instrument(skip(self), err)]
    async fn permissions_for_role(&self, role_id: RoleId) -> AuthResult<Vec<Permission>> {
        let sql = format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions p \
             JOIN role_permissions rp ON rp.permission_id = p.id \
             WHERE rp.role_id = $1 ORDER BY p.name"
        );
        self.fetch_permissions("permissions_for_role", &sql, Some(role_id.into()))
            .await
    }

    #[instrument(skip(self), err)]
    async fn grant(&self, role_id: RoleId, permission_id: PermissionId) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id, created_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (role_id, permission_id) DO NOTHING",
        )
        .bind(Uuid::from(role_id))
        .bind(Uuid::from(permission_id))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("grant_permission", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn roles_for_user(&self, user_id: UserId) -> AuthResult<Vec<Role>> {
        let sql = format!(
            "SELECT {ROLE_COLUMNS} FROM roles r \
             JOIN user_roles ur ON ur.role_id = r.id \
             WHERE ur.user_id = $1 ORDER BY r.name"
        );
        self.fetch_roles("roles_for_user", &sql, Some(user_id.into()))
            .await
    }

    #[instrument(skip(self), err)]
    async fn permissions_for_user(&self, user_id: UserId) -> AuthResult<Vec<Permission>> {
        let sql = format!(
            "SELECT DISTINCT {PERMISSION_COLUMNS} FROM permissions p \
             JOIN role_permissions rp ON rp.permission_id = p.id \
             JOIN user_roles ur ON ur.role_id = rp.role_id \
             WHERE ur.user_id = $1 ORDER BY p.name"
        );
        self.fetch_permissions("permissions_for_user", &sql, Some(user_id.into()))
            .await
    }

    #[instrument(skip(self), err)]
    async fn assign(&self, user_id: UserId, role_id: RoleId) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id, created_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (user_id, role_id) DO NOTHING",
        )
        .bind(Uuid::from(user_id))
        .bind(Uuid::from(role_id))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("assign_role", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn unassign(&self, user_id: UserId, role_id: RoleId) -> AuthResult<()> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(Uuid::from(user_id))
            .bind(Uuid::from(role_id))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_role", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn user_has_permission(&self, user_id: UserId, permission: &str) -> AuthResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS ( \
                SELECT 1 FROM user_roles ur \
                JOIN role_permissions rp ON rp.role_id = ur.role_id \
                JOIN permissions p ON p.id = rp.permission_id \
                WHERE ur.user_id = $1 AND p.name = $2 \
             )",
        )
        .bind(Uuid::from(user_id))
        .bind(permission)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("has_permission", e))?;
        row.try_get::<bool, _>(0)
            .map_err(|e| AuthError::storage("has_permission", e))
    }
}

#[derive(Debug, Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Build the filtered audit query. Optional predicates are appended only when
/// set; every value is a bound parameter.
pub(crate) fn audit_query(filter: &AuditFilter, page: Pagination) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {AUDIT_COLUMNS} FROM audit_logs WHERE 1=1"));
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(Uuid::from(user_id));
    }
    if let Some(action) = &filter.action {
        qb.push(" AND action = ").push_bind(action.clone());
    }
    if let Some(resource_type) = &filter.resource_type {
        qb.push(" AND resource_type = ").push_bind(resource_type.clone());
    }
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);
    qb
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    #[instrument(skip(self, entry), fields(action = %entry.action, resource_type = %entry.resource_type), err)]
    async fn append(&self, entry: NewAuditEntry) -> AuthResult<AuditLogEntry> {
        let sql = format!(
            "INSERT INTO audit_logs ({AUDIT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, NOW())) \
             RETURNING {AUDIT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::from(AuditLogId::new()))
            .bind(entry.user_id.map(Uuid::from))
            .bind(&entry.action)
            .bind(&entry.resource_type)
            .bind(&entry.resource_id)
            .bind(&entry.ip_address)
            .bind(&entry.user_agent)
            .bind(&entry.details)
            .bind(entry.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("append_audit", e))?;
        decode("append_audit", &row, audit_from_row)
    }

    #[instrument(skip(self), err)]
    async fn query(&self, filter: &AuditFilter, page: Pagination) -> AuthResult<Vec<AuditLogEntry>> {
        let mut qb = audit_query(filter, page);
        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_audit", e))?;
        decode_all("query_audit", &rows, audit_from_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfiltered_query_only_binds_paging() {
        let qb = audit_query(&AuditFilter::default(), Pagination::default());
        assert_eq!(
            qb.sql(),
            "SELECT id, user_id, action, resource_type, resource_id, ip_address, user_agent, details, created_at \
             FROM audit_logs WHERE 1=1 ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn filters_are_numbered_in_order() {
        let filter = AuditFilter {
            user_id: Some(UserId::new()),
            action: Some("LOGIN".into()),
            resource_type: Some("user".into()),
        };
        let qb = audit_query(&filter, Pagination::new(Some(10), Some(20)));
        let sql = qb.sql();
        assert!(sql.contains("AND user_id = $1 AND action = $2 AND resource_type = $3"));
        assert!(sql.ends_with("LIMIT $4 OFFSET $5"));
    }

    #[test]
    fn filter_values_never_reach_the_sql_text() {
        let filter = AuditFilter {
            user_id: None,
            action: Some("'; DROP TABLE audit_logs; --".into()),
            resource_type: None,
        };
        let qb = audit_query(&filter, Pagination::default());
        assert!(!qb.sql().contains("DROP TABLE"));
        assert!(qb.sql().contains("AND action = $1 ORDER BY"));
    }
}
