//! Unified error handling for the admin API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::bling::BlingError;

/// Application-level error type for admin handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bling API operation failed.
    #[error("Bling error: {0}")]
    Bling(#[from] BlingError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(&self, Self::Bling(e) if !matches!(e, BlingError::InvalidProductId(_))) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let status = match &self {
            Self::Bling(BlingError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Bling(BlingError::InvalidProductId(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Bling(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Bling(BlingError::NotConfigured) => "Bling integration is not configured".to_string(),
            Self::Bling(e @ BlingError::InvalidProductId(_)) => e.to_string(),
            Self::Bling(_) => "External service error".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}
