//! Local usearch-backed vector store.
//!
//! Each index name maps to its own HNSW index under `root/{name}`. Indexes
//! are opened lazily on first upsert and written to disk on [`flush`].
//!
//! [`flush`]: VectorStore::flush

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{error, info};
use vandelay_embeddings::Embedding;

use crate::error::VectorError;
use crate::hnsw::{HnswConfig, HnswIndex};
use crate::store::{validate_index_name, IndexDocument, VectorStore};

/// Vector store backed by on-disk HNSW indexes.
pub struct LocalVectorStore {
    root: PathBuf,
    dimension: usize,
    indexes: Mutex<HashMap<String, Arc<HnswIndex>>>,
}

impl LocalVectorStore {
    pub fn new(root: impl Into<PathBuf>, dimension: usize) -> Self {
        Self {
            root: root.into(),
            dimension,
            indexes: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of vectors currently held by `index_name`.
    pub async fn count(&self, index_name: &str) -> Result<usize, VectorError> {
        self.open(index_name).await?.len()
    }

    async fn open(&self, index_name: &str) -> Result<Arc<HnswIndex>, VectorError> {
        validate_index_name(index_name)?;

        let mut indexes = self.indexes.lock().await;
        if let Some(index) = indexes.get(index_name) {
            return Ok(index.clone());
        }

        let config = HnswConfig::new(self.dimension, self.root.join(index_name));
        let index = run_blocking(move || HnswIndex::open_or_create(config)).await?;
        let index = Arc::new(index);
        indexes.insert(index_name.to_string(), index.clone());
        Ok(index)
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    async fn upsert(&self, index_name: &str, doc: &IndexDocument) -> Result<(), VectorError> {
        let index = self.open(index_name).await?;
        let id = doc.id.get();
        let embedding = Embedding::from_normalized(doc.embedding.clone());

        run_blocking(move || index.upsert(id, &embedding)).await
    }

    async fn flush(&self) -> Result<(), VectorError> {
        let indexes: Vec<(String, Arc<HnswIndex>)> = self
            .indexes
            .lock()
            .await
            .iter()
            .map(|(name, index)| (name.clone(), index.clone()))
            .collect();

        let mut first_error = None;
        for (name, index) in indexes {
            if let Err(e) = run_blocking(move || index.save()).await {
                error!(index = %name, error = %e, "Failed to save vector index");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(root = %self.root.display(), "Vector indexes flushed");
                Ok(())
            }
        }
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, VectorError>
where
    F: FnOnce() -> Result<T, VectorError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VectorError::Task(e.to_string()))?
}
