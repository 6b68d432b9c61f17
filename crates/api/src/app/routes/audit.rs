use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::app::dto::{AuditLogQuery, AuditLogsResponse, PaginationEcho};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/logs", get(audit_logs))
}

/// GET /audit/logs?user_id=&action=&resource_type=&limit=&offset=
///
/// Newest first. Unparsable paging values fall back to defaults; a malformed
/// `user_id` is rejected.
pub async fn audit_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Response, ApiError> {
    let filter = query.filter()?;
    let page = services.audit.query(&filter, query.pagination()).await?;

    Ok(Json(AuditLogsResponse {
        pagination: PaginationEcho {
            count: page.entries.len(),
            limit: page.pagination.limit,
            offset: page.pagination.offset,
        },
        logs: page.entries,
    })
    .into_response())
}
