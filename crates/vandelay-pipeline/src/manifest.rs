//! Manifest accumulation and the terminal JSON write.

use tracing::info;

use vandelay_storage::{BlobStore, CONTENT_TYPE_JSON};
use vandelay_types::EnrichedRecord;

use crate::error::PipelineError;

/// Collects enriched records for the end-of-run manifest.
#[derive(Debug, Default)]
pub struct ManifestWriter {
    records: Vec<EnrichedRecord>,
}

impl ManifestWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: EnrichedRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EnrichedRecord] {
        &self.records
    }

    /// Render the manifest as a pretty-printed UTF-8 JSON array.
    ///
    /// With `sort_by_id` the records are ordered by record ID; otherwise
    /// they keep the order they were pushed in.
    pub fn to_json(&mut self, sort_by_id: bool) -> Result<Vec<u8>, PipelineError> {
        if sort_by_id {
            self.records.sort_by_key(EnrichedRecord::id);
        }
        Ok(serde_json::to_vec_pretty(&self.records)?)
    }

    /// Serialize and store the manifest under `key`. Returns the entry count.
    pub async fn write(
        mut self,
        blobs: &dyn BlobStore,
        key: &str,
        sort_by_id: bool,
    ) -> Result<usize, PipelineError> {
        let body = self.to_json(sort_by_id)?;
        blobs.put(key, &body, CONTENT_TYPE_JSON).await?;

        info!(
            key = %key,
            entries = self.records.len(),
            bytes = body.len(),
            "Manifest written"
        );
        Ok(self.records.len())
    }
}
