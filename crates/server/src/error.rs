use axum::{
    Json,
    response::{IntoResponse, Response},
};
use services::services::{creation::CreationError, gallery::GalleryError, identity::IdentityError};
use thiserror::Error;
use utils::response::{ApiResponse, ErrorCode};

const PERSISTENCE_MESSAGE: &str = "Could not save your changes. Please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Creation(#[from] CreationError),
    #[error(transparent)]
    Gallery(#[from] GalleryError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn code_and_message(&self) -> (ErrorCode, String) {
        match self {
            ApiError::Creation(err) => match err {
                CreationError::Validation(message) => {
                    (ErrorCode::ValidationError, message.clone())
                }
                CreationError::VendorUnavailable { message, .. } => {
                    (ErrorCode::VendorUnavailable, message.clone())
                }
                CreationError::ExtractionFailed => (ErrorCode::ExtractionFailed, err.to_string()),
                CreationError::Database(_) => {
                    (ErrorCode::PersistenceError, PERSISTENCE_MESSAGE.to_string())
                }
            },
            ApiError::Gallery(err) => match err {
                GalleryError::CreationNotFound | GalleryError::NotOwnedOrMissing => {
                    (ErrorCode::NotFound, err.to_string())
                }
                GalleryError::Database(_) => {
                    (ErrorCode::PersistenceError, PERSISTENCE_MESSAGE.to_string())
                }
            },
            ApiError::Identity(err) => match err {
                IdentityError::MissingToken => {
                    (ErrorCode::Unauthorized, "Not authenticated".to_string())
                }
                IdentityError::InvalidToken(_) => (
                    ErrorCode::Unauthorized,
                    "Invalid or expired session".to_string(),
                ),
                IdentityError::NotConfigured => (
                    ErrorCode::Unauthorized,
                    "Authentication is unavailable".to_string(),
                ),
            },
            ApiError::BadRequest(message) => (ErrorCode::ValidationError, message.clone()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, message) = self.code_and_message();
        match code {
            ErrorCode::PersistenceError => tracing::error!("Storage failure: {:?}", self),
            ErrorCode::VendorUnavailable => tracing::warn!("{}", self),
            ErrorCode::Unauthorized => tracing::debug!("Rejected request: {}", self),
            _ => tracing::debug!("Request failed: {}", self),
        }
        // Handled failures keep HTTP 200 so clients only branch on `success`.
        Json(ApiResponse::<()>::error(code, message)).into_response()
    }
}
