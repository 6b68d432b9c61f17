//! Request gates and the blanket audit layer.

use std::sync::Arc;

use axum::extract::{OriginalUri, RawPathParams, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use serde_json::json;

use warden_auth::{Identity, RoleRequirement, infer_resource_type};
use warden_core::{AuthError, AuthResult};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::ClientInfo;

/// Authenticate gate: requires a valid `Authorization: Bearer <token>`.
///
/// On success the caller's [`Identity`] is attached to the request for
/// handlers, and to the response so outer layers (audit) can see who acted,
/// including when an inner gate rejected the request.
pub async fn authenticate(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;
    let claims = services.tokens.validate(token).inspect_err(|e| {
        tracing::debug!(error = %e, "bearer token rejected");
    })?;

    let identity = Identity::from(claims);
    req.extensions_mut().insert(identity.clone());

    let mut response = next.run(req).await;
    response.extensions_mut().insert(identity);
    Ok(response)
}

/// Authorize-by-role gate. Must run inside [`authenticate`].
pub async fn require_roles(
    State(requirement): State<RoleRequirement>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = req.extensions().get::<Identity>();
    if let Err(e) = requirement.check(identity) {
        tracing::warn!(
            user_id = ?identity.map(|i| i.user_id),
            role = ?identity.map(|i| i.role.as_str()),
            path = %req.uri().path(),
            "role gate denied request"
        );
        return Err(e.into());
    }
    Ok(next.run(req).await)
}

/// Write one audit entry per routed request once the response is known.
///
/// The health path is skipped. A failed write is logged and never changes
/// the response.
pub async fn audit_requests(
    State(services): State<Arc<AppServices>>,
    params: Option<RawPathParams>,
    req: Request,
    next: Next,
) -> Response {
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let config = &services.config;
    if path == config.health_path {
        return next.run(req).await;
    }

    let method = req.method().as_str().to_string();
    let client = ClientInfo::resolve(req.headers(), req.extensions());
    let resource_id = params.and_then(|p| {
        p.iter()
            .find(|(name, _)| *name == "id")
            .map(|(_, value)| value.to_string())
    });

    let response = next.run(req).await;

    let identity = response.extensions().get::<Identity>();
    let ctx = client.audit_context(identity);
    let resource_type = infer_resource_type(&path, &config.api_prefix);
    let details = json!({
        "path": path,
        "method": method,
        "status": response.status().as_u16(),
    });

    if let Err(e) = services
        .audit
        .record_from_request(&ctx, &method, &resource_type, resource_id, Some(&details))
        .await
    {
        tracing::warn!(error = %e, %path, %method, "audit write failed");
    }

    response
}

fn extract_bearer(headers: &HeaderMap) -> AuthResult<&str> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::Unauthorized)?;

    let header = header
        .to_str()
        .map_err(|_| AuthError::invalid_token("authorization header is not valid text"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::invalid_token("authorization header must use the Bearer scheme"))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::invalid_token("empty bearer token"));
    }
    Ok(token)
}
