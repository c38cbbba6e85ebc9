//! HTTP error envelope for the download routes.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::download::RetrievalError;

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Bad request (invalid input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The retrieval core failed.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// Response could not be assembled.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body: `{ "error": <kind>, "message": <text> }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable error kind.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

impl HttpError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Retrieval(RetrievalError::InvalidId { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Retrieval(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Retrieval(e) => e.kind(),
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), error = %self, "request failed");
        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
