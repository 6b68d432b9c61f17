use core::str::FromStr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};

use warden_auth::{AuditFilter, AuditLogEntry, Pagination, UserResponse};
use warden_core::{AuthError, UserId};

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

/// Either identifies the role by id or by name; id wins when both are given.
#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role_id: Option<String>,
    pub role_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub type CreatePermissionRequest = CreateRoleRequest;

#[derive(Debug, Deserialize)]
pub struct GrantPermissionRequest {
    #[serde(default)]
    pub permission_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PermissionCheckQuery {
    pub permission: Option<String>,
}

/// Raw audit query string. Numbers stay strings so unparsable values fall
/// back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl AuditLogQuery {
    pub fn filter(&self) -> Result<AuditFilter, ApiError> {
        let user_id = match non_empty(&self.user_id) {
            Some(raw) => Some(parse_id::<UserId>(raw)?),
            None => None,
        };
        Ok(AuditFilter {
            user_id,
            action: non_empty(&self.action).map(str::to_string),
            resource_type: non_empty(&self.resource_type).map(str::to_string),
        })
    }

    pub fn pagination(&self) -> Pagination {
        let number = |raw: &Option<String>| raw.as_deref().and_then(|v| v.trim().parse::<i64>().ok());
        Pagination::new(number(&self.limit), number(&self.offset))
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct PaginationEcho {
    pub count: usize,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct AuditLogsResponse {
    pub logs: Vec<AuditLogEntry>,
    pub pagination: PaginationEcho,
}

// -------------------------
// Mapping helpers
// -------------------------

/// Unwrap a JSON body, turning extractor rejections into the shared error shape.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|rejection| ApiError(AuthError::field("body", rejection.body_text())))
}

pub fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = AuthError>,
{
    raw.trim().parse::<T>().map_err(ApiError)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
