use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use ethcache_core::CoreError;

use crate::auth::AuthError;

// ==============================================================================
// Error Type
// ==============================================================================

pub(crate) enum AppError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Map core failures onto HTTP statuses, preserving the message verbatim.
impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::InvalidParams(_) | CoreError::Decode(_) => {
                Self::BadRequest(err.to_string())
            }
            CoreError::Rpc(_) => Self::BadGateway(err.to_string()),
            CoreError::Store(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized("invalid credentials".to_string()),
            AuthError::Unauthorized(msg) => Self::Unauthorized(msg),
            AuthError::Core(core) => Self::from(core),
            AuthError::Internal(msg) => Self::Internal(msg),
        }
    }
}
