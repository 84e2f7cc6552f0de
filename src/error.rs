use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptchaError {
    #[error("Invalid bitmap: {0}")]
    InvalidBitmap(String),

    #[error("Degenerate contrast factor {0}: stretch denominator is not positive")]
    DegenerateContrast(f32),

    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("Failed to process image: {0}")]
    ProcessingError(String),

    #[error("Unknown OCR engine: {0}")]
    UnknownEngine(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for CaptchaError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            CaptchaError::InvalidBitmap(_) => (StatusCode::BAD_REQUEST, "INVALID_BITMAP"),
            CaptchaError::DegenerateContrast(_) => (StatusCode::BAD_REQUEST, "DEGENERATE_CONTRAST"),
            CaptchaError::InitializationError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INIT_ERROR")
            }
            CaptchaError::ProcessingError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_ERROR")
            }
            CaptchaError::UnknownEngine(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_ENGINE"),
            CaptchaError::ImageTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE")
            }
            CaptchaError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            CaptchaError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            CaptchaError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
