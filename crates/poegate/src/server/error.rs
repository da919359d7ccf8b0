use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use poegate_core::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Produces the `{"error": ...}` bodies orchestrator scripts already
/// expect, plus a machine-readable `code`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Invalid or missing authentication token")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core @ CoreError::UnknownPort { .. }) => {
                (StatusCode::BAD_REQUEST, "UNKNOWN_PORT", core.to_string())
            }
            AppError::Core(core) => {
                tracing::error!(error = %core, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    core.to_string(),
                )
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
