//! Gate-bounded record retrieval.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use vandelay_client::CatalogSource;
use vandelay_types::{EnrichedRecord, RecordId};

use crate::gate::ConcurrencyGate;

/// Fetches single records, holding a gate permit for the duration of each
/// catalog request.
pub struct RecordFetcher {
    source: Arc<dyn CatalogSource>,
    gate: ConcurrencyGate,
    id_field: String,
    asset_key_field: Option<String>,
}

impl RecordFetcher {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        gate: ConcurrencyGate,
        id_field: impl Into<String>,
    ) -> Self {
        Self {
            source,
            gate,
            id_field: id_field.into(),
            asset_key_field: None,
        }
    }

    /// Strip `field` from every fetched payload.
    ///
    /// The asset key is only ever set by the asset stage, so a value the
    /// catalog already carries under that name must not reach the manifest.
    pub fn with_asset_key_field(mut self, field: impl Into<String>) -> Self {
        self.asset_key_field = Some(field.into());
        self
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Fetch one record. Any failure yields `None`; the record is dropped
    /// from the run.
    pub async fn fetch(&self, id: RecordId) -> Option<EnrichedRecord> {
        let _permit = match self.gate.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!(record_id = %id, error = %e, "Fetch not admitted");
                return None;
            }
        };

        match self.source.get_object(id).await {
            Ok(mut fields) => {
                if let Some(payload_id) = fields.get(&self.id_field).and_then(Value::as_u64) {
                    if payload_id != id.get() {
                        warn!(
                            record_id = %id,
                            payload_id,
                            "Payload identifier differs from requested id"
                        );
                    }
                }
                if let Some(field) = &self.asset_key_field {
                    if fields.remove(field).is_some() {
                        debug!(
                            record_id = %id,
                            field = %field,
                            "Dropped catalog-supplied asset key"
                        );
                    }
                }
                debug!(record_id = %id, "Fetched record");
                Some(EnrichedRecord::new(id, fields))
            }
            Err(e) if e.is_not_found() => {
                debug!(record_id = %id, "Record not found");
                None
            }
            Err(e) => {
                warn!(record_id = %id, error = %e, "Failed to fetch record");
                None
            }
        }
    }
}
