//! Unified error handling for the API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use shop_qr_core::QrCodeError;

use crate::db::RepositoryError;
use crate::shopify::ShopifyError;

/// Body returned when no session could be resolved.
pub const UNAUTHENTICATED_MESSAGE: &str = "Could not find a Shopify session";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// No valid session on the request.
    #[error("Could not find a Shopify session")]
    Unauthenticated,

    /// Record absent or owned by another shop.
    #[error("Not found")]
    NotFound,

    /// Client input failed validation.
    #[error("{0}")]
    Validation(#[from] QrCodeError),

    /// Request body could not be decoded.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Storage(#[from] RepositoryError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Platform(#[from] ShopifyError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Storage errors for a missing row become a plain not-found.
    #[must_use]
    pub fn from_lookup(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NotFound | Self::Storage(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Platform(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        match self {
            Self::Unauthenticated => (status, UNAUTHENTICATED_MESSAGE).into_response(),
            Self::NotFound | Self::Storage(RepositoryError::NotFound) => status.into_response(),
            Self::Storage(_) | Self::Internal(_) => {
                (status, "Internal server error").into_response()
            }
            Self::Platform(_) => (status, "Shopify request failed").into_response(),
            other => (status, other.to_string()).into_response(),
        }
    }
}

/// Tag the Sentry scope with the current shop.
pub fn set_sentry_shop(shop: &str) {
    sentry::configure_scope(|scope| {
        scope.set_tag("shop", shop);
    });
}
