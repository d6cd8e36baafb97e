//! Error types for the enrichment pipeline.
//!
//! Only run-level failures surface here. Per-record problems are logged
//! and turned into skipped stages instead.

use thiserror::Error;
use vandelay_client::ClientError;
use vandelay_storage::StorageError;

/// Errors that abort an enrichment run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The catalog listing could not be retrieved
    #[error("Listing failed: {0}")]
    Listing(#[from] ClientError),

    /// The manifest could not be written
    #[error("Manifest write failed: {0}")]
    Manifest(#[from] StorageError),

    /// JSON encoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid pipeline configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The run was stopped before the manifest was written
    #[error("Run interrupted before the manifest was written")]
    Interrupted,
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}
