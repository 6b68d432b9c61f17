use std::sync::Arc;

use axum::extract::Extension;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::app::services::AppServices;

/// The health route, mounted at the configured absolute `path`.
pub fn router(path: &str) -> Router {
    Router::new().route(path, get(health))
}

/// GET <health path> - liveness probe. Never audited.
pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "env": services.config.env,
    }))
}
