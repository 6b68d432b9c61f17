//! HTTP application wiring.
//!
//! - `services.rs`: store backend selection and service assembly
//! - `routes/`: handlers, one file per resource
//! - `dto.rs`: request/response DTOs and mapping helpers
//! - `errors.rs`: the shared JSON error shape

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use warden_auth::RoleRequirement;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
///
/// Layering, outermost first: tracing, blanket audit, bearer authentication
/// (protected routes only), admin role gate (admin routes only).
pub fn build_app(services: Arc<services::AppServices>) -> Router {
    let admin = routes::admin_router().route_layer(from_fn_with_state(
        RoleRequirement::admin(),
        middleware::require_roles,
    ));

    let protected = routes::user_router()
        .merge(admin)
        .route_layer(from_fn_with_state(services.clone(), middleware::authenticate));

    let api = routes::public_router().merge(protected);

    Router::new()
        .merge(routes::system::router(&services.config.health_path))
        .nest(&services.config.api_prefix, api)
        .route_layer(from_fn_with_state(services.clone(), middleware::audit_requests))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(Extension(services)),
        )
}
