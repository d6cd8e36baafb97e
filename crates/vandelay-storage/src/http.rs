//! HTTP object store backend.
//!
//! Issues `PUT {endpoint}/{bucket}/{key}` with the object's content type.
//! Works against S3-compatible gateways and presigned-style upload proxies
//! that accept a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::blob::{validate_key, BlobStore};
use crate::error::StorageError;

/// Configuration for [`HttpBlobStore`].
#[derive(Debug, Clone)]
pub struct HttpBlobStoreConfig {
    /// Endpoint base URL (e.g., "http://localhost:9000")
    pub endpoint: String,

    /// Optional bucket inserted between endpoint and key
    pub bucket: Option<String>,

    /// Optional bearer token
    pub token: Option<SecretString>,

    /// Request timeout
    pub timeout: Duration,
}

impl HttpBlobStoreConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            bucket: None,
            token: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }
}

/// Blob store that uploads objects over HTTP.
pub struct HttpBlobStore {
    client: Client,
    config: HttpBlobStoreConfig,
}

impl HttpBlobStore {
    pub fn new(config: HttpBlobStoreConfig) -> Result<Self, StorageError> {
        if !(config.endpoint.starts_with("http://") || config.endpoint.starts_with("https://")) {
            return Err(StorageError::Config(format!(
                "blob endpoint must be an http(s) URL, got {}",
                config.endpoint
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// URL an object key is uploaded to.
    pub fn object_url(&self, key: &str) -> String {
        let base = self.config.endpoint.trim_end_matches('/');
        match &self.config.bucket {
            Some(bucket) => format!("{}/{}/{}", base, bucket.trim_matches('/'), key),
            None => format!("{}/{}", base, key),
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    fn describe(&self) -> String {
        self.object_url("")
    }

    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let url = self.object_url(key);

        let mut request = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes.to_vec());

        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected { status, body });
        }

        debug!(url = %url, bytes = bytes.len(), "Uploaded blob");
        Ok(())
    }
}
