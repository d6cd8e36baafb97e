//! # vandelay-embeddings
//!
//! Local image embedding generation for the Vandelay pipeline using Candle.
//!
//! Turns raw image bytes into a fixed-length vector suitable for
//! nearest-neighbour search.
//!
//! ## Features
//! - Local inference via Candle (no Python, no API)
//! - CLIP ViT-B/32 image encoder (512 dimensions)
//! - Automatic model file caching
//! - JPEG, PNG and WebP decoding
//!
//! The model is loaded once with [`ClipEmbedder::load`] and then shared
//! read-only behind the [`ImageEmbedder`] trait.

pub mod cache;
pub mod clip;
pub mod error;
pub mod model;
pub mod preprocess;

pub use crate::clip::{ClipEmbedder, EMBEDDING_DIM};
pub use cache::{
    get_or_download_model, ModelCache, ModelPaths, DEFAULT_MODEL_REPO, DEFAULT_MODEL_REVISION,
};
pub use error::EmbeddingError;
pub use model::{Embedding, ImageEmbedder, ModelInfo};
pub use preprocess::{load_image_tensor, IMAGE_SIZE};
