//! Error handling module for VideoStudio

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type at the crate boundary (CLI, configuration, exports)
#[derive(Error, Debug)]
pub enum StudioError {
    /// Error raised by the editing core
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Preview frames could not be encoded
    #[error("Image export failed: {0}")]
    Image(#[from] image::ImageError),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for VideoStudio operations
pub type StudioResult<T> = std::result::Result<T, StudioError>;
