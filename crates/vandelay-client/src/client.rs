//! reqwest-backed catalog client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use vandelay_types::{RawRecord, RecordId};

use crate::error::ClientError;
use crate::source::{AssetSource, CatalogSource};

/// Default catalog base URL.
pub const DEFAULT_BASE_URL: &str = "https://collectionapi.metmuseum.org/public/collection/v1";

/// Configuration for [`CatalogClient`].
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// API base URL, without trailing slash
    pub base_url: String,

    /// Timeout for the listing request
    pub listing_timeout: Duration,

    /// Timeout for a single record request
    pub record_timeout: Duration,

    /// Timeout for an image download
    pub asset_timeout: Duration,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            listing_timeout: Duration::from_secs(60),
            record_timeout: Duration::from_secs(10),
            asset_timeout: Duration::from_secs(20),
        }
    }
}

impl CatalogClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeouts(mut self, listing: Duration, record: Duration, asset: Duration) -> Self {
        self.listing_timeout = listing;
        self.record_timeout = record;
        self.asset_timeout = asset;
        self
    }
}

#[derive(Deserialize)]
struct ObjectListing {
    #[serde(rename = "objectIDs", default)]
    object_ids: Option<Vec<u64>>,
}

/// HTTP client for the collection API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    config: CatalogClientConfig,
}

impl CatalogClient {
    /// Create a new catalog client.
    pub fn new(config: CatalogClientConfig) -> Result<Self, ClientError> {
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "catalog base URL must be an http(s) URL, got {}",
                config.base_url
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("vandelay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CatalogClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<Response, ClientError> {
        let response = self.client.get(url).timeout(timeout).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn list_object_ids(&self) -> Result<Vec<RecordId>, ClientError> {
        let url = self.url("objects");
        let response = self.get(&url, self.config.listing_timeout).await?;
        let body = response.bytes().await?;
        let listing: ObjectListing = serde_json::from_slice(&body)?;

        let ids: Vec<RecordId> = listing
            .object_ids
            .unwrap_or_default()
            .into_iter()
            .map(RecordId::new)
            .collect();

        info!(count = ids.len(), "Found objects");
        Ok(ids)
    }

    async fn get_object(&self, id: RecordId) -> Result<RawRecord, ClientError> {
        let url = self.url(&format!("objects/{}", id));
        let response = self.get(&url, self.config.record_timeout).await?;
        let body = response.bytes().await?;

        match serde_json::from_slice::<Value>(&body)? {
            Value::Object(record) => {
                debug!(record_id = %id, fields = record.len(), "Fetched object");
                Ok(record)
            }
            other => Err(ClientError::Parse(format!(
                "object {} is not a JSON object: {}",
                id,
                type_name(&other)
            ))),
        }
    }
}

#[async_trait]
impl AssetSource for CatalogClient {
    async fn download(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let response = self.get(url, self.config.asset_timeout).await?;
        let bytes = response.bytes().await?;
        debug!(url = %url, bytes = bytes.len(), "Downloaded asset");
        Ok(bytes.to_vec())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
