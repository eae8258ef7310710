//! Error responses for the relay endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No upstream credential configured; fatal to the request.
    #[error("ELEVENLABS_API_KEY is not configured on the server")]
    MissingApiKey,

    /// The request carried no usable text.
    #[error("missing required field: text")]
    MissingText,

    /// The synthesis service answered with a non-success status; its
    /// status and body are mirrored back to the caller.
    #[error("synthesis service error ({status})")]
    Upstream { status: u16, details: String },

    /// The upstream request never completed.
    #[error("upstream request failed: {0}")]
    Gateway(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::MissingApiKey | ApiError::MissingText => (
                StatusCode::BAD_REQUEST,
                json!({ "error": self.to_string() }),
            ),
            ApiError::Upstream { status, details } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                json!({ "error": "synthesis service error", "details": details }),
            ),
            ApiError::Gateway(details) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "upstream request failed", "details": details }),
            ),
        };
        (status, Json(body)).into_response()
    }
}
