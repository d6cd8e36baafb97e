//! Error types shared across the Vandelay crates.

use thiserror::Error;

/// Unified error type for settings and record handling.
#[derive(Debug, Error)]
pub enum VandelayError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
