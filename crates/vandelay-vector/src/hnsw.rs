//! HNSW index implementation using usearch.
//!
//! Parameters favor recall over build speed:
//! - M = 16 (connections per layer)
//! - ef_construction = 200 (build-time quality)
//! - ef_search = 100 (search-time quality)

use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};
use vandelay_embeddings::{Embedding, EMBEDDING_DIM};

use crate::error::VectorError;

const INDEX_FILE: &str = "hnsw.usearch";

/// HNSW index configuration
#[derive(Debug, Clone)]
pub struct HnswConfig {
    /// Embedding dimension (must match model)
    pub dimension: usize,
    /// Number of connections per layer (M parameter)
    pub connectivity: usize,
    /// Build-time search depth (ef_construction)
    pub expansion_add: usize,
    /// Query-time search depth (ef_search)
    pub expansion_search: usize,
    /// Directory holding the index file
    pub index_path: PathBuf,
    /// Initial slot reservation; grows by doubling
    pub capacity: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            dimension: EMBEDDING_DIM,
            connectivity: 16,
            expansion_add: 200,
            expansion_search: 100,
            index_path: PathBuf::from("./vector-index"),
            capacity: 1024,
        }
    }
}

impl HnswConfig {
    pub fn new(dimension: usize, index_path: impl Into<PathBuf>) -> Self {
        Self {
            dimension,
            index_path: index_path.into(),
            ..Default::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    fn options(&self) -> IndexOptions {
        IndexOptions {
            dimensions: self.dimension,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: self.connectivity,
            expansion_add: self.expansion_add,
            expansion_search: self.expansion_search,
            multi: false, // one vector per record
        }
    }
}

/// HNSW index wrapper around usearch.
///
/// Keys are catalog record IDs. All methods take `&self`; writers hold the
/// lock exclusively so an upsert's remove and add are observed together.
pub struct HnswIndex {
    index: RwLock<Index>,
    config: HnswConfig,
}

impl HnswIndex {
    /// Open the index stored under `config.index_path`, or create an empty one.
    pub fn open_or_create(config: HnswConfig) -> Result<Self, VectorError> {
        let index_file = config.index_path.join(INDEX_FILE);
        let index = Index::new(&config.options()).map_err(|e| VectorError::Index(e.to_string()))?;

        if index_file.exists() {
            info!(path = ?index_file, "Opening existing vector index");
            index
                .load(path_str(&index_file)?)
                .map_err(|e| VectorError::Index(format!("Failed to load: {}", e)))?;
            if index.dimensions() != config.dimension {
                return Err(VectorError::DimensionMismatch {
                    expected: config.dimension,
                    actual: index.dimensions(),
                });
            }
        } else {
            info!(path = ?index_file, dim = config.dimension, "Creating new vector index");
            std::fs::create_dir_all(&config.index_path)?;
            index
                .reserve(config.capacity)
                .map_err(|e| VectorError::Index(e.to_string()))?;
        }

        Ok(Self {
            index: RwLock::new(index),
            config,
        })
    }

    /// Get the index file path
    pub fn index_file(&self) -> PathBuf {
        self.config.index_path.join(INDEX_FILE)
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    pub fn len(&self) -> Result<usize, VectorError> {
        Ok(self.read()?.size())
    }

    pub fn is_empty(&self) -> Result<bool, VectorError> {
        Ok(self.len()? == 0)
    }

    pub fn contains(&self, id: u64) -> Result<bool, VectorError> {
        Ok(self.read()?.contains(id))
    }

    /// Insert or replace the vector stored under `id`.
    #[allow(clippy::readonly_write_lock)] // usearch::Index uses interior mutability
    pub fn upsert(&self, id: u64, embedding: &Embedding) -> Result<(), VectorError> {
        if embedding.dimension() != self.config.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.dimension(),
            });
        }

        let index = self.write()?;
        let replaced = index.contains(id);
        if replaced {
            index
                .remove(id)
                .map_err(|e| VectorError::Index(e.to_string()))?;
        }

        if index.size() >= index.capacity() {
            let grown = (index.capacity() * 2).max(self.config.capacity);
            index
                .reserve(grown)
                .map_err(|e| VectorError::Index(e.to_string()))?;
        }

        index
            .add(id, &embedding.values)
            .map_err(|e| VectorError::Index(e.to_string()))?;

        debug!(id = id, replaced = replaced, "Upserted vector");
        Ok(())
    }

    /// Save index to disk
    pub fn save(&self) -> Result<(), VectorError> {
        let index = self.read()?;
        let path = self.index_file();
        index
            .save(path_str(&path)?)
            .map_err(|e| VectorError::Index(format!("Failed to save: {}", e)))?;

        info!(path = ?path, vectors = index.size(), "Saved vector index");
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Index>, VectorError> {
        self.index
            .read()
            .map_err(|_| VectorError::Index("index lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Index>, VectorError> {
        self.index
            .write()
            .map_err(|_| VectorError::Index("index lock poisoned".to_string()))
    }
}

fn path_str(path: &std::path::Path) -> Result<&str, VectorError> {
    path.to_str()
        .ok_or_else(|| VectorError::Index("Invalid path encoding".to_string()))
}
