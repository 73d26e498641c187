//! HTTP boundary errors.
//!
//! Every collaborator failure reaches the client the same way: a 500 with the
//! underlying message as `detail`. Structural problems with the request are
//! rejected with 422 before any collaborator is called.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::inference::InferenceError;
use crate::storage::StorageError;

/// Error returned by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The inference provider failed.
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),

    /// Writing an upload failed.
    #[error("upload failed: {0}")]
    Storage(#[from] StorageError),

    /// The multipart body could not be read.
    #[error("upload failed: {0}")]
    Multipart(String),

    /// The request is structurally incomplete.
    #[error("{0}")]
    Unprocessable(String),
}

/// JSON body for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl AppError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Inference(_) | Self::Storage(_) | Self::Multipart(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Unprocessable(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %detail, "Request failed");
        } else {
            tracing::warn!(error = %detail, "Request rejected");
        }

        (status, Json(ErrorBody { detail })).into_response()
    }
}
