//! Error types and handling
//!
//! Common error types used across the viewer.

use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Library is locked")]
    Locked,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Recording not found: {0}")]
    NotFound(String),

    #[error("Recording has no playable media: {0}")]
    Unplayable(String),
}

/// Error response for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Store(StoreError::Unavailable(_)) => "STORE_UNAVAILABLE",
            AppError::Store(StoreError::Read(_)) => "STORE_READ_FAILED",
            AppError::Store(StoreError::Write(_)) => "STORE_WRITE_FAILED",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Locked => "LOCKED",
            AppError::InvalidPassword => "INVALID_PASSWORD",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unplayable(_) => "UNPLAYABLE",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorResponse {}

impl From<StoreError> for ErrorResponse {
    fn from(error: StoreError) -> Self {
        AppError::from(error).into()
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
