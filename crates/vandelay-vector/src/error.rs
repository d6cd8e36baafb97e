//! Vector index error types.

use thiserror::Error;

/// Errors that can occur during vector operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// usearch index error
    #[error("Index error: {0}")]
    Index(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Index name unusable as a path segment
    #[error("Invalid index name: {0:?}")]
    InvalidIndexName(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport failure talking to a remote index
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote index answered with a non-success status
    #[error("Index rejected document with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Backend misconfiguration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Blocking index task failed to complete
    #[error("Index task failed: {0}")]
    Task(String),
}
