use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use imagere_core::TransformError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No image file provided")]
    MissingImage,

    #[error("Invalid image format")]
    InvalidImage,

    #[error("{0}")]
    BadRequest(String),

    #[error("Image file is too large: {size} bytes (max {max})")]
    FileTooLarge { size: usize, max: usize },

    #[error("Request body is too large (max {max} bytes)")]
    BodyTooLarge { max: usize },

    #[error("Method not allowed. Use POST to upload an image.")]
    MethodNotAllowed,

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("Internal error: {0}")]
    Internal(String),
}

const PROCESSING_ERROR: &str = "Image processing error";

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingImage | ApiError::InvalidImage | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::FileTooLarge { .. } | ApiError::BodyTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Transform(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Transform(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side failures are logged, never echoed back
        let message = if status.is_server_error() {
            tracing::error!("Image processing error: {}", self);
            PROCESSING_ERROR.to_string()
        } else {
            tracing::warn!("Rejected request ({}): {}", status.as_u16(), self);
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
