//! Filesystem blob store.
//!
//! Keys map to paths under a root directory. Writes go to a sibling
//! `.partial` file first and are renamed into place, so a reader never sees
//! a half-written manifest.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::blob::{validate_key, BlobStore};
use crate::error::StorageError;

/// Blob store backed by a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a key is stored at.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }

    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut partial = path.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &path).await?;

        debug!(key = %key, bytes = bytes.len(), content_type = %content_type, "Stored blob");
        Ok(())
    }
}
