use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use warden_auth::{PermissionId, RoleId, RoleResponse};

use crate::app::dto::{self, CreateRoleRequest, GrantPermissionRequest};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/:id", get(get_role))
        .route("/:id/permissions", post(grant_permission))
}

/// GET /roles
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ApiError> {
    let roles = services.graph.list_roles().await?;
    let roles = services.graph.describe_roles(&roles).await?;
    Ok(Json(json!({ "roles": roles })).into_response())
}

/// GET /roles/:id
pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let role = services.graph.get_role_by_id(dto::parse_id(&id)?).await?;
    let permissions = services.graph.permissions_for_role(role.id).await?;
    Ok(Json(json!({ "role": RoleResponse::new(&role, &permissions) })).into_response())
}

/// POST /roles
pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CreateRoleRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = dto::body(payload)?;
    let role = services
        .graph
        .create_role(&request.name, &request.description)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "role": RoleResponse::new(&role, &[]) })),
    )
        .into_response())
}

/// POST /roles/:id/permissions - granting an already granted permission is a no-op.
pub async fn grant_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<GrantPermissionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let role_id = dto::parse_id::<RoleId>(&id)?;
    let request = dto::body(payload)?;
    let permission_id = dto::parse_id::<PermissionId>(&request.permission_id)?;

    services.graph.grant_permission(role_id, permission_id).await?;
    Ok(Json(json!({ "message": "Permission granted successfully" })).into_response())
}
