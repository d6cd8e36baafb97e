//! Storage layer error types.

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// Key is empty or escapes the store root
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Filesystem operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request to the object endpoint failed before a response
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Object endpoint rejected the write
    #[error("Remote store returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Invalid backend configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
