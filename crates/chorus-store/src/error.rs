use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by a document store client.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached or refused the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid collection path: {0}")]
    InvalidPath(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Errors produced while uploading an attachment.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Local file not found: {0}")]
    NotFound(PathBuf),

    #[error("Attachment too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("Invalid attachment name: {0}")]
    InvalidName(String),

    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
