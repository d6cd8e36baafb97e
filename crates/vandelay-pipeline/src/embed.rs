//! Embedding stage: runs the image model on the blocking pool.

use std::sync::Arc;

use tracing::{debug, warn};

use vandelay_embeddings::{Embedding, ImageEmbedder};
use vandelay_types::RecordId;

pub struct EmbeddingStage {
    embedder: Arc<dyn ImageEmbedder>,
}

impl EmbeddingStage {
    pub fn new(embedder: Arc<dyn ImageEmbedder>) -> Self {
        Self { embedder }
    }

    /// Embed `image`. Decode or inference failure yields `None`.
    pub async fn generate(&self, id: RecordId, image: Vec<u8>) -> Option<Embedding> {
        let embedder = self.embedder.clone();
        let result = tokio::task::spawn_blocking(move || embedder.embed(&image)).await;

        match result {
            Ok(Ok(embedding)) => {
                debug!(record_id = %id, dim = embedding.dimension(), "Generated embedding");
                Some(embedding)
            }
            Ok(Err(e)) => {
                warn!(record_id = %id, error = %e, "Failed to generate embedding");
                None
            }
            Err(e) => {
                warn!(record_id = %id, error = %e, "Embedding task failed");
                None
            }
        }
    }
}
