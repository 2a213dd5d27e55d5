use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Image storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Database(e) => {
                tracing::error!(error = %e, "Database failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            ServerError::Storage(e) => {
                tracing::error!(error = %e, "Image storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Image storage error".to_string())
            }
            ServerError::Internal(e) => {
                tracing::error!(error = %e, "Internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "ok": false,
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
