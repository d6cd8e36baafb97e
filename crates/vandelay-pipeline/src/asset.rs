//! Conditional image download and blob persistence.

use std::sync::Arc;

use reqwest::Url;
use tracing::{debug, warn};

use vandelay_client::AssetSource;
use vandelay_storage::BlobStore;
use vandelay_types::{image_key, ImageAsset, RecordId};

/// Whether `url` points at an image with the accepted suffix.
///
/// Only the URL path is inspected, so query strings and fragments do not
/// matter. The comparison ignores ASCII case.
pub fn accepts_url(url: &str, suffix: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => parsed
            .path()
            .to_ascii_lowercase()
            .ends_with(&suffix.to_ascii_lowercase()),
        Err(_) => false,
    }
}

/// Downloads a record's primary image and stores it under `{prefix}/{id}`.
pub struct AssetFetcher {
    source: Arc<dyn AssetSource>,
    blobs: Arc<dyn BlobStore>,
    suffix: String,
    key_prefix: String,
    content_type: String,
}

impl AssetFetcher {
    pub fn new(
        source: Arc<dyn AssetSource>,
        blobs: Arc<dyn BlobStore>,
        suffix: impl Into<String>,
        key_prefix: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            source,
            blobs,
            suffix: suffix.into(),
            key_prefix: key_prefix.into(),
            content_type: content_type.into(),
        }
    }

    /// Download and persist the image at `url`.
    ///
    /// Returns `None` without any network call when the URL is missing or
    /// lacks the accepted suffix, and `None` when download or upload fails.
    pub async fn fetch(&self, id: RecordId, url: Option<&str>) -> Option<ImageAsset> {
        let url = match url {
            Some(url) if accepts_url(url, &self.suffix) => url,
            Some(url) => {
                debug!(record_id = %id, url = %url, "Skipping asset without accepted suffix");
                return None;
            }
            None => {
                debug!(record_id = %id, "Record has no asset URL");
                return None;
            }
        };

        let bytes = match self.source.download(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(record_id = %id, url = %url, error = %e, "Failed to download asset");
                return None;
            }
        };

        let key = image_key(&self.key_prefix, id);
        if let Err(e) = self.blobs.put(&key, &bytes, &self.content_type).await {
            warn!(record_id = %id, key = %key, error = %e, "Failed to store asset");
            return None;
        }

        debug!(record_id = %id, key = %key, bytes = bytes.len(), "Stored asset");
        Some(ImageAsset::new(key, bytes))
    }
}
