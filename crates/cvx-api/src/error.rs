//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cvx_core::CvError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    #[schema(example = "UNSUPPORTED_FORMAT")]
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    PayloadTooLarge { size: usize, limit: usize },
    UnsupportedFormat(String),
    ExtractionFailure(String),
    ModelUnavailable(String),
    Dispatch(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
            AppError::PayloadTooLarge { size, limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ApiError::new("PAYLOAD_TOO_LARGE", "Document exceeds the upload limit")
                    .with_details(format!("{size} bytes, limit {limit}")),
            ),
            AppError::UnsupportedFormat(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                ApiError::new("UNSUPPORTED_FORMAT", "Only pdf and docx documents are accepted")
                    .with_details(msg),
            ),
            AppError::ExtractionFailure(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::new("EXTRACTION_FAILURE", "Document could not be read").with_details(msg),
            ),
            AppError::ModelUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::new("MODEL_UNAVAILABLE", "Entity model unavailable").with_details(msg),
            ),
            AppError::Dispatch(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("DISPATCH_ERROR", "Record could not be dispatched").with_details(msg),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::internal_error().with_details(msg),
            ),
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<CvError> for AppError {
    fn from(err: CvError) -> Self {
        match err {
            CvError::UnsupportedFormat(msg) => AppError::UnsupportedFormat(msg),
            CvError::ExtractionFailure(msg) => AppError::ExtractionFailure(msg),
            CvError::ModelUnavailable(msg) => AppError::ModelUnavailable(msg),
            CvError::ConfigError(msg) => AppError::Internal(format!("Configuration error: {msg}")),
            CvError::DispatchError(msg) => AppError::Dispatch(msg),
            CvError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<cvx_dispatch::DispatchError> for AppError {
    fn from(err: cvx_dispatch::DispatchError) -> Self {
        AppError::Dispatch(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CvError::UnsupportedFormat("txt".into()), StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (CvError::ExtractionFailure("bad zip".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (CvError::ModelUnavailable("gone".into()), StatusCode::SERVICE_UNAVAILABLE),
            (CvError::ConfigError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
