//! Index persister: upserts record embeddings into the vector store.

use std::sync::Arc;

use tracing::{debug, info, warn};

use vandelay_embeddings::Embedding;
use vandelay_types::RecordId;
use vandelay_vector::{IndexDocument, VectorStore};

pub struct IndexPersister {
    store: Arc<dyn VectorStore>,
    index_name: String,
}

impl IndexPersister {
    pub fn new(store: Arc<dyn VectorStore>, index_name: impl Into<String>) -> Self {
        Self {
            store,
            index_name: index_name.into(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Upsert the document for `id`. Failures are logged and reported as `false`.
    pub async fn persist(&self, id: RecordId, embedding: &Embedding) -> bool {
        let doc = IndexDocument::new(id, embedding);
        match self.store.upsert(&self.index_name, &doc).await {
            Ok(()) => {
                debug!(record_id = %id, index = %self.index_name, "Indexed embedding");
                true
            }
            Err(e) => {
                warn!(
                    record_id = %id,
                    index = %self.index_name,
                    error = %e,
                    "Failed to index embedding"
                );
                false
            }
        }
    }

    /// Make upserted documents durable. Failures are logged and reported as `false`.
    pub async fn flush(&self) -> bool {
        match self.store.flush().await {
            Ok(()) => {
                info!(
                    index = %self.index_name,
                    store = %self.store.describe(),
                    "Vector index flushed"
                );
                true
            }
            Err(e) => {
                warn!(index = %self.index_name, error = %e, "Failed to flush vector index");
                false
            }
        }
    }
}
