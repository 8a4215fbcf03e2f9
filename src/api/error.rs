use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::Error;

/// Error type for the HTTP boundary.
/// Wraps the crate error and maps each kind to a status code with a
/// `{"error": "..."}` body.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::UnknownService(_) | Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::MissingField { .. } | Error::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Error::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "internal error");
            "an internal error occurred".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
