//! Embedding model trait and types.
//!
//! Defines the interface for generating vector embeddings from image bytes.

use crate::error::EmbeddingError;

/// Vector embedding - a normalized float array.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// The embedding vector (normalized to unit length)
    pub values: Vec<f32>,
}

impl Embedding {
    /// Create a new embedding from a vector.
    /// Normalizes the vector to unit length.
    pub fn new(values: Vec<f32>) -> Self {
        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        let normalized = if norm > 0.0 {
            values.iter().map(|x| x / norm).collect()
        } else {
            values
        };
        Self { values: normalized }
    }

    /// Create embedding without normalization (for pre-normalized vectors)
    pub fn from_normalized(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name (e.g., "clip-vit-base-patch32")
    pub name: String,
    /// Embedding dimension
    pub dimension: usize,
    /// Square input resolution in pixels
    pub image_size: usize,
}

/// Trait for image embedding models.
///
/// A model is loaded once at startup and then shared read-only across every
/// embedding call, so implementations must be thread-safe (Send + Sync) and
/// hold no per-call state. Calls are CPU-bound; async callers should run
/// them on the blocking pool.
pub trait ImageEmbedder: Send + Sync {
    /// Get model information
    fn info(&self) -> &ModelInfo;

    /// Decode `image` (encoded JPEG/PNG/WebP bytes) and embed it.
    fn embed(&self, image: &[u8]) -> Result<Embedding, EmbeddingError>;
}
