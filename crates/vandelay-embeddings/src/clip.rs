//! Candle-based image embedder.
//!
//! Uses the CLIP ViT-B/32 vision tower and projection for 512-dimensional
//! embeddings.

use std::path::Path;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::clip::{ClipConfig, ClipModel};
use tracing::{debug, info};

use crate::cache::{get_or_download_model, ModelCache};
use crate::error::EmbeddingError;
use crate::model::{Embedding, ImageEmbedder, ModelInfo};
use crate::preprocess::{load_image_tensor, IMAGE_SIZE};

/// Embedding dimension for CLIP ViT-B/32 image features
pub const EMBEDDING_DIM: usize = 512;

/// Candle-based embedder using CLIP ViT-B/32.
pub struct ClipEmbedder {
    model: ClipModel,
    device: Device,
    info: ModelInfo,
}

impl ClipEmbedder {
    /// Load the embedding model from cache (downloading if needed).
    pub fn load(cache: &ModelCache) -> Result<Self, EmbeddingError> {
        let paths = get_or_download_model(cache)?;
        Self::load_from_path(&paths.weights)
    }

    /// Load from an explicit safetensors file
    pub fn load_from_path(weights_path: &Path) -> Result<Self, EmbeddingError> {
        info!("Loading image embedding model...");

        if !weights_path.exists() {
            return Err(EmbeddingError::ModelNotFound(
                weights_path.display().to_string(),
            ));
        }

        // Use CPU device (GPU support can be added later with feature flags)
        let device = Device::Cpu;
        let config = ClipConfig::vit_base_patch32();

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path.to_path_buf()], DType::F32, &device)?
        };
        let model = ClipModel::new(vb, &config)?;

        info!(
            dim = EMBEDDING_DIM,
            image_size = IMAGE_SIZE,
            "Model loaded successfully"
        );

        Ok(Self {
            model,
            device,
            info: ModelInfo {
                name: "clip-vit-base-patch32".to_string(),
                dimension: EMBEDDING_DIM,
                image_size: IMAGE_SIZE,
            },
        })
    }
}

impl ImageEmbedder for ClipEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, image: &[u8]) -> Result<Embedding, EmbeddingError> {
        let pixels = load_image_tensor(image, self.info.image_size, &self.device)?;

        let features = self.model.get_image_features(&pixels)?;
        let values: Vec<f32> = features.squeeze(0)?.to_vec1()?;

        if values.len() != EMBEDDING_DIM {
            return Err(EmbeddingError::DimensionMismatch {
                expected: EMBEDDING_DIM,
                actual: values.len(),
            });
        }

        debug!(bytes = image.len(), dim = values.len(), "Embedded image");
        Ok(Embedding::new(values))
    }
}
