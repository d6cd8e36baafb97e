//! Transport traits the pipeline depends on.

use async_trait::async_trait;

use vandelay_types::{RawRecord, RecordId};

use crate::error::ClientError;

/// Source of catalog records.
///
/// Implementations are shared by every in-flight fetch and must tolerate
/// concurrent calls.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// List every record identifier for this run.
    async fn list_object_ids(&self) -> Result<Vec<RecordId>, ClientError>;

    /// Fetch one record payload.
    async fn get_object(&self, id: RecordId) -> Result<RawRecord, ClientError>;
}

/// Downloader for binary assets referenced by records.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Download the bytes behind `url`.
    async fn download(&self, url: &str) -> Result<Vec<u8>, ClientError>;
}
