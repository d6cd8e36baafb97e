//! Blob store trait.

use async_trait::async_trait;

use crate::error::StorageError;

/// Content type used for the manifest blob.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Write-only object store keyed by slash-separated paths.
///
/// Implementations must be safe to share between concurrent tasks.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Human-readable destination, used in log lines.
    fn describe(&self) -> String;

    /// Store `bytes` under `key`, replacing any previous value.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;
}

/// Reject keys that are empty, absolute, or climb out of the store root.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.trim().is_empty() {
        return Err(StorageError::InvalidKey("empty key".to_string()));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    if key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keys() {
        assert!(validate_key("images/3").is_ok());
        assert!(validate_key("met_objects.json").is_ok());
        assert!(validate_key("runs/2024/manifest.json").is_ok());
    }

    #[test]
    fn test_invalid_keys() {
        for key in ["", "  ", "/etc/passwd", "../escape", "images//3", "a/./b", "a\\b"] {
            assert!(
                matches!(validate_key(key), Err(StorageError::InvalidKey(_))),
                "expected {:?} to be rejected",
                key
            );
        }
    }
}
