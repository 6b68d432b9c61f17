//! Registration and login.
//!
//! Both write an explicit audit entry. Unlike the blanket per-request entry,
//! a failure to write it fails the request.

use std::sync::Arc;

use axum::extract::Extension;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use warden_auth::audit::{ACTION_LOGIN, ACTION_REGISTER};
use warden_auth::{User, UserLogin, UserRegistration};

use crate::app::dto::{self, AuthResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::ClientInfo;

/// Resource type recorded for registration/login entries.
const USER_RESOURCE: &str = "user";

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// POST /auth/register
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    client: ClientInfo,
    payload: Result<Json<UserRegistration>, JsonRejection>,
) -> Result<Response, ApiError> {
    let registration = dto::body(payload)?;
    let user = services.credentials.create(&registration).await?;
    let token = issue_token(&services, &user)?;

    let details = json!({ "username": user.username, "email": user.email });
    services
        .audit
        .record_from_request(
            &audit_context(&client, &user),
            ACTION_REGISTER,
            USER_RESOURCE,
            Some(user.id.to_string()),
            Some(&details),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            user: user.to_response(),
            token,
        }),
    )
        .into_response())
}

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    client: ClientInfo,
    payload: Result<Json<UserLogin>, JsonRejection>,
) -> Result<Response, ApiError> {
    let login = dto::body(payload)?;
    login.check()?;

    let user = services
        .credentials
        .authenticate(&login.username, &login.password)
        .await?;
    let token = issue_token(&services, &user)?;

    let details = json!({ "username": user.username });
    services
        .audit
        .record_from_request(
            &audit_context(&client, &user),
            ACTION_LOGIN,
            USER_RESOURCE,
            Some(user.id.to_string()),
            Some(&details),
        )
        .await?;

    tracing::info!(user_id = %user.id, "login succeeded");
    Ok(Json(AuthResponse {
        message: "Login successful",
        user: user.to_response(),
        token,
    })
    .into_response())
}

fn issue_token(services: &AppServices, user: &User) -> Result<String, ApiError> {
    let tokens = &services.tokens;
    Ok(tokens.issue(user.id, &user.username, &user.role, tokens.expiration_hours())?)
}

fn audit_context(client: &ClientInfo, user: &User) -> warden_auth::AuditContext {
    let mut ctx = client.audit_context(None);
    ctx.user_id = Some(user.id);
    ctx
}
