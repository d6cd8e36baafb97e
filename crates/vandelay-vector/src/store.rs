//! Vector store trait and document type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vandelay_embeddings::Embedding;
use vandelay_types::RecordId;

use crate::error::VectorError;

/// Document written to the index for one record.
///
/// Wire shape is `{"objectID": <id>, "embedding": [f32, ...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    #[serde(rename = "objectID")]
    pub id: RecordId,
    pub embedding: Vec<f32>,
}

impl IndexDocument {
    pub fn new(id: RecordId, embedding: &Embedding) -> Self {
        Self {
            id,
            embedding: embedding.values.clone(),
        }
    }
}

/// Destination for record embeddings.
///
/// `upsert` is keyed by the document's record ID; writing the same ID twice
/// leaves a single document holding the latest vector.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Human-readable location, for logs
    fn describe(&self) -> String;

    async fn upsert(&self, index_name: &str, doc: &IndexDocument) -> Result<(), VectorError>;

    /// Make previously upserted documents durable.
    async fn flush(&self) -> Result<(), VectorError>;
}

/// Reject index names that cannot be used as a single path segment.
pub fn validate_index_name(name: &str) -> Result<(), VectorError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);

    if bad {
        return Err(VectorError::InvalidIndexName(name.to_string()));
    }
    Ok(())
}
