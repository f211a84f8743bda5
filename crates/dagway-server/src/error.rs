//! Error types for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dagway_dispatch::DispatchError;
use dagway_metadata::MetadataError;
use thiserror::Error;

use crate::envelope::{EnvelopeBase, ResponseEnvelope};

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Authentication failed.
    #[error("{0}")]
    Forbidden(String),

    /// The request is malformed or names something that does not exist.
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("{0}")]
    Internal(String),

    /// Validation or execution failure from the dispatch layer.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Metadata database failure.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Dispatch(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            ServerError::Metadata(MetadataError::NotFound(_) | MetadataError::Duplicate(_)) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Internal(_)
            | ServerError::Dispatch(_)
            | ServerError::Metadata(_)
            | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render into `base`, logging by severity.
    pub fn into_envelope(self, base: EnvelopeBase) -> ResponseEnvelope {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "Server error");
        } else {
            tracing::warn!(status = %status, error = %message, "Client error");
        }

        base.failure(status, message)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        self.into_envelope(EnvelopeBase::without_arguments())
            .into_response()
    }
}
