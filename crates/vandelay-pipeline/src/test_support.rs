//! In-process stand-ins for the pipeline's collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use vandelay_client::{AssetSource, CatalogSource, ClientError};
use vandelay_embeddings::{Embedding, EmbeddingError, ImageEmbedder, ModelInfo};
use vandelay_types::{RawRecord, RecordId};
use vandelay_vector::{IndexDocument, VectorError, VectorStore};

pub fn raw(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

pub fn record_with_image(id: u64, url: &str) -> RawRecord {
    raw(json!({"objectID": id, "title": format!("Object {id}"), "primaryImage": url}))
}

#[derive(Default)]
pub struct StubCatalog {
    pub ids: Vec<RecordId>,
    pub records: HashMap<RecordId, RawRecord>,
    /// Ids whose fetch never completes
    pub pending: Vec<RecordId>,
    pub fail_listing: bool,
}

impl StubCatalog {
    pub fn with_record(mut self, id: u64, record: RawRecord) -> Self {
        self.ids.push(RecordId::new(id));
        self.records.insert(RecordId::new(id), record);
        self
    }

    pub fn with_missing(mut self, id: u64) -> Self {
        self.ids.push(RecordId::new(id));
        self
    }

    pub fn with_pending(mut self, id: u64) -> Self {
        self.ids.push(RecordId::new(id));
        self.pending.push(RecordId::new(id));
        self
    }
}

#[async_trait]
impl CatalogSource for StubCatalog {
    async fn list_object_ids(&self) -> Result<Vec<RecordId>, ClientError> {
        if self.fail_listing {
            return Err(ClientError::Status {
                status: 500,
                url: "stub://objects".to_string(),
            });
        }
        Ok(self.ids.clone())
    }

    async fn get_object(&self, id: RecordId) -> Result<RawRecord, ClientError> {
        if self.pending.contains(&id) {
            futures::future::pending::<()>().await;
        }
        self.records.get(&id).cloned().ok_or(ClientError::Status {
            status: 404,
            url: format!("stub://objects/{id}"),
        })
    }
}

/// Serves the URL's bytes back as the asset body.
#[derive(Default)]
pub struct EchoAssets {
    pub calls: AtomicUsize,
    pub fail: bool,
}

#[async_trait]
impl AssetSource for EchoAssets {
    async fn download(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ClientError::Status {
                status: 500,
                url: url.to_string(),
            });
        }
        Ok(url.as_bytes().to_vec())
    }
}

/// Byte-sum embedder; fails on inputs containing `fail`.
pub struct StubEmbedder {
    info: ModelInfo,
    pub calls: AtomicUsize,
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self {
            info: ModelInfo {
                name: "stub".to_string(),
                dimension: 4,
                image_size: 1,
            },
            calls: AtomicUsize::new(0),
        }
    }
}

impl ImageEmbedder for StubEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, image: &[u8]) -> Result<Embedding, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if image.windows(4).any(|w| w == b"fail") {
            return Err(EmbeddingError::InvalidInput("undecodable".to_string()));
        }
        let sum: f32 = image.iter().map(|b| *b as f32).sum();
        Ok(Embedding::new(vec![sum, 1.0, 2.0, image.len() as f32]))
    }
}

#[derive(Default)]
pub struct RecordingVectors {
    pub docs: Mutex<Vec<(String, IndexDocument)>>,
    pub fail: bool,
    pub flushes: AtomicUsize,
}

impl RecordingVectors {
    pub fn ids(&self) -> Vec<RecordId> {
        let mut ids: Vec<RecordId> = self.docs.lock().unwrap().iter().map(|(_, d)| d.id).collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl VectorStore for RecordingVectors {
    fn describe(&self) -> String {
        "recording".to_string()
    }

    async fn upsert(&self, index_name: &str, doc: &IndexDocument) -> Result<(), VectorError> {
        if self.fail {
            return Err(VectorError::Rejected {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.docs
            .lock()
            .unwrap()
            .push((index_name.to_string(), doc.clone()));
        Ok(())
    }

    async fn flush(&self) -> Result<(), VectorError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
