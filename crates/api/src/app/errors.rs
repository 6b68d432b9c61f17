use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use warden_core::AuthError;

/// HTTP face of [`AuthError`]. Handlers return `Result<_, ApiError>` and let
/// `?` do the mapping.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            AuthError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({
                    "error": "validation_error",
                    "message": "validation failed",
                    "fields": fields,
                })),
            )
                .into_response(),
            AuthError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
            AuthError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
            AuthError::InvalidCredentials => {
                json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "Invalid credentials")
            }
            AuthError::InvalidToken(msg) => {
                json_error(StatusCode::UNAUTHORIZED, "unauthorized", format!("invalid token: {msg}"))
            }
            AuthError::Unauthorized => {
                json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required")
            }
            AuthError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
            AuthError::NotFound(what) => {
                json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
            }
            AuthError::Config(msg) => server_error("config_error", msg),
            AuthError::Storage(msg) => server_error("storage_error", msg),
            AuthError::Internal(msg) => server_error("internal_error", msg),
        }
    }
}

fn server_error(code: &'static str, detail: String) -> Response {
    tracing::error!(code, error = %detail, "request failed");
    let message = if cfg!(debug_assertions) {
        detail
    } else {
        "internal server error".to_string()
    };
    json_error(StatusCode::INTERNAL_SERVER_ERROR, code, message)
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (AuthError::field("username", "is required"), StatusCode::BAD_REQUEST),
            (AuthError::invalid_id("UserId: bad"), StatusCode::BAD_REQUEST),
            (AuthError::conflict("username already exists"), StatusCode::CONFLICT),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::invalid_token("expired"), StatusCode::UNAUTHORIZED),
            (AuthError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AuthError::forbidden("insufficient permissions"), StatusCode::FORBIDDEN),
            (AuthError::not_found("role"), StatusCode::NOT_FOUND),
            (AuthError::config("no secret"), StatusCode::INTERNAL_SERVER_ERROR),
            (AuthError::storage("list_roles", "down"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err.clone()).into_response().status(), status, "{err:?}");
        }
    }
}
