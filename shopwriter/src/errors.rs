use crate::api::models::content::ErrorResponse;
use crate::generation::GenerationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

pub const VALIDATION_DETAIL: &str = "Invalid JSON format for context_data or missing required fields.";
pub const SERVICE_UNAVAILABLE_DETAIL: &str = "AI Service connection failed. Check API key and service status.";
pub const INTERNAL_DETAIL: &str = "AI content generation failed due to an unexpected server error.";

#[derive(ThisError, Debug)]
pub enum Error {
    /// The `context_data` payload is not valid JSON or misses required fields
    #[error("Invalid context_data: {message}")]
    Validation { message: String },

    /// Missing, non-image, or undecodable uploads
    #[error("{message}")]
    InvalidInput { message: String },

    /// Request body exceeded the configured upload limit
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// The generation service is not configured or could not be reached
    #[error("Generation service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    /// The loaded configuration is inconsistent or incomplete
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::InvalidConfig { .. } | Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { .. } => VALIDATION_DETAIL.to_string(),
            Error::InvalidInput { message } | Error::PayloadTooLarge { message } => message.clone(),
            Error::ServiceUnavailable { .. } => SERVICE_UNAVAILABLE_DETAIL.to_string(),
            Error::InvalidConfig { .. } | Error::Internal { .. } | Error::Other(_) => INTERNAL_DETAIL.to_string(),
        }
    }
}

impl From<GenerationError> for Error {
    fn from(err: GenerationError) -> Self {
        if err.is_unavailable() {
            Error::ServiceUnavailable { reason: err.to_string() }
        } else {
            Error::Other(anyhow::Error::new(err).context("generate product content"))
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for operators - the response body only carries the user message
        match &self {
            Error::InvalidConfig { .. } | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::ServiceUnavailable { .. } => {
                tracing::warn!("Generation service unavailable: {:#}", self);
            }
            Error::Validation { .. } | Error::InvalidInput { .. } | Error::PayloadTooLarge { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = ErrorResponse {
            detail: self.user_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
