use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde_json::json;

use warden_auth::{
    Identity, PermissionResponse, Role, RoleRequirement, authorize_self_or_admin,
};
use warden_core::{AuthError, RoleId, UserId};

use crate::app::dto::{self, AssignRoleRequest, PermissionCheckQuery};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/userinfo", get(userinfo))
        .route("/:id/roles", get(user_roles).post(assign_role))
        .route("/:id/roles/:role_id", delete(remove_role))
        .route("/:id/permissions", get(user_permissions))
        .route("/:id/permissions/check", get(check_permission))
}

/// GET /users/userinfo - the caller's own public profile.
pub async fn userinfo(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, ApiError> {
    let user = services.credentials.get_by_id(identity.user_id).await?;
    Ok(Json(json!({ "user": user.to_response() })).into_response())
}

/// GET /users/:id/roles
pub async fn user_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let user_id = readable_user(&identity, &id)?;
    let roles = services.graph.roles_for_user(user_id).await?;
    let roles = services.graph.describe_roles(&roles).await?;
    Ok(Json(json!({ "roles": roles })).into_response())
}

/// GET /users/:id/permissions
pub async fn user_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let user_id = readable_user(&identity, &id)?;
    let permissions: Vec<PermissionResponse> = services
        .graph
        .permissions_for_user(user_id)
        .await?
        .iter()
        .map(PermissionResponse::from)
        .collect();
    Ok(Json(json!({ "permissions": permissions })).into_response())
}

/// GET /users/:id/permissions/check?permission=<name>
pub async fn check_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Query(query): Query<PermissionCheckQuery>,
) -> Result<Response, ApiError> {
    let user_id = readable_user(&identity, &id)?;
    let permission = query
        .permission
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AuthError::field("permission", "is required"))?;

    let has_permission = services.graph.has_permission(user_id, permission).await?;
    Ok(Json(json!({ "has_permission": has_permission })).into_response())
}

/// POST /users/:id/roles - admin only; assigning a held role is a no-op.
pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    payload: Result<Json<AssignRoleRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    RoleRequirement::admin().check(Some(&identity))?;
    let user_id = dto::parse_id::<UserId>(&id)?;
    let request = dto::body(payload)?;

    services.credentials.get_by_id(user_id).await?;
    let role = resolve_role(&services, &request).await?;
    services.graph.assign_role(user_id, role.id).await?;

    Ok(Json(json!({ "message": "Role assigned successfully" })).into_response())
}

/// DELETE /users/:id/roles/:role_id - admin only; removing an absent role is a no-op.
pub async fn remove_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path((id, role_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    RoleRequirement::admin().check(Some(&identity))?;
    let user_id = dto::parse_id::<UserId>(&id)?;
    let role_id = dto::parse_id::<RoleId>(&role_id)?;

    services.graph.remove_role(user_id, role_id).await?;
    Ok(Json(json!({ "message": "Role removed successfully" })).into_response())
}

fn readable_user(identity: &Identity, raw: &str) -> Result<UserId, ApiError> {
    let user_id = dto::parse_id::<UserId>(raw)?;
    authorize_self_or_admin(identity, user_id)?;
    Ok(user_id)
}

async fn resolve_role(services: &AppServices, request: &AssignRoleRequest) -> Result<Role, ApiError> {
    let by_id = request.role_id.as_deref().filter(|v| !v.trim().is_empty());
    let by_name = request.role_name.as_deref().filter(|v| !v.trim().is_empty());
    let role = match (by_id, by_name) {
        (Some(raw), _) => services.graph.get_role_by_id(dto::parse_id(raw)?).await?,
        (None, Some(name)) => services.graph.get_role_by_name(name.trim()).await?,
        (None, None) => return Err(AuthError::field("role_id", "is required").into()),
    };
    Ok(role)
}
