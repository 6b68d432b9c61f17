use std::sync::Arc;

use axum::extract::Extension;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use warden_auth::PermissionResponse;

use crate::app::dto::{self, CreatePermissionRequest};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/", get(list_permissions).post(create_permission))
}

pub async fn list_permissions(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ApiError> {
    let permissions: Vec<PermissionResponse> = services
        .graph
        .list_permissions()
        .await?
        .iter()
        .map(PermissionResponse::from)
        .collect();
    Ok(Json(json!({ "permissions": permissions })).into_response())
}

pub async fn create_permission(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CreatePermissionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = dto::body(payload)?;
    let permission = services
        .graph
        .create_permission(&request.name, &request.description)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "permission": PermissionResponse::from(&permission) })),
    )
        .into_response())
}
