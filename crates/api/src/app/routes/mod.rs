use axum::Router;

pub mod audit;
pub mod auth;
pub mod permissions;
pub mod roles;
pub mod system;
pub mod users;

/// Routes open to anyone. The health route is mounted separately, outside
/// the prefix, at its configured path.
pub fn public_router() -> Router {
    Router::new().nest("/auth", auth::router())
}

/// Routes for any authenticated caller. Handlers apply their own
/// self-or-admin and admin checks.
pub fn user_router() -> Router {
    Router::new().nest("/users", users::router())
}

/// Routes behind the admin role gate.
pub fn admin_router() -> Router {
    Router::new()
        .nest("/roles", roles::router())
        .nest("/permissions", permissions::router())
        .nest("/audit", audit::router())
}
