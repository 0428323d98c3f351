//! Error handling for the storage helpers
//!
//! This module defines the error type shared by the helpers, the storage
//! clients and the configuration layer.

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, StorageError>;

/// Error types that can occur when talking to object storage
#[derive(Error, Debug)]
pub enum StorageError {
    /// Invalid parameter
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Payload exceeds the configured upload limit
    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    /// Payload media type is not accepted by the helper
    #[error("Invalid file type: {content_type}")]
    InvalidFileType { content_type: String },

    /// Upload transfer failed
    #[error("Upload failed: {message}")]
    UploadError { message: String },

    /// Download URL could not be resolved
    #[error("Download URL lookup failed: {message}")]
    DownloadUrlError { message: String },

    /// Delete failed
    #[error("Delete failed: {path} - {message}")]
    DeleteError { path: String, message: String },

    /// No object stored at the path
    #[error("Object not found: {path}")]
    ObjectNotFound { path: String },

    /// Operation is not allowed on the bucket root
    #[error("Operation not allowed on the root reference: {operation}")]
    RootOperation { operation: String },

    /// Operation was cancelled
    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL construction error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl StorageError {
    /// Create a new invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        StorageError::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    pub fn file_too_large(size: u64, limit: u64) -> Self {
        StorageError::FileTooLarge { size, limit }
    }

    pub fn invalid_file_type(content_type: impl Into<String>) -> Self {
        StorageError::InvalidFileType {
            content_type: content_type.into(),
        }
    }

    /// Create a new upload error
    pub fn upload_error(message: impl Into<String>) -> Self {
        StorageError::UploadError {
            message: message.into(),
        }
    }

    /// Create a new download URL error
    pub fn download_url_error(message: impl Into<String>) -> Self {
        StorageError::DownloadUrlError {
            message: message.into(),
        }
    }

    /// Create a new delete error
    pub fn delete_error(path: impl Into<String>, message: impl Into<String>) -> Self {
        StorageError::DeleteError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn object_not_found(path: impl Into<String>) -> Self {
        StorageError::ObjectNotFound { path: path.into() }
    }

    pub fn root_operation(operation: impl Into<String>) -> Self {
        StorageError::RootOperation {
            operation: operation.into(),
        }
    }

    /// Create a new cancelled error
    pub fn cancelled(operation: impl Into<String>) -> Self {
        StorageError::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a new configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        StorageError::ConfigError {
            message: message.into(),
        }
    }

    /// Whether the error was raised before any storage call was made
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StorageError::InvalidParameter { .. }
                | StorageError::FileTooLarge { .. }
                | StorageError::InvalidFileType { .. }
        )
    }
}
