//! HTTP mapping for the shared error taxonomy.
//!
//! REST handlers return `Result<_, ApiError>`; the conversion here is
//! the single place the taxonomy meets HTTP status codes, and the JSON
//! body mirrors the wire `error` event shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::shared::error::ChatError;

/// Newtype so the axum conversion lives in the backend while
/// [`ChatError`] itself stays transport-free.
#[derive(Debug)]
pub struct ApiError(pub ChatError);

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        Self(err)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self(ChatError::from(err))
    }
}

/// 400 validation, 401 unauthenticated, 404 not found, 429 policy,
/// 500 internal.
pub fn status_code(err: &ChatError) -> StatusCode {
    match err {
        ChatError::Validation { .. } => StatusCode::BAD_REQUEST,
        ChatError::Auth { .. } => StatusCode::UNAUTHORIZED,
        ChatError::NotFound { .. } => StatusCode::NOT_FOUND,
        ChatError::Transient { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        ChatError::Policy { .. } => StatusCode::TOO_MANY_REQUESTS,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_code(&self.0);
        let body = json!({
            "error": {
                "code": self.0.kind(),
                "message": self.0.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
