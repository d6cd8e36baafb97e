//! Image decoding and normalization.
//!
//! Produces the `(1, 3, H, W)` float tensor CLIP expects: RGB channels
//! first, pixels scaled from `[0, 255]` to `[-1, 1]`.

use candle_core::{DType, Device, Tensor};
use image::imageops::FilterType;

use crate::error::EmbeddingError;

/// Square input resolution of the CLIP ViT-B/32 vision tower
pub const IMAGE_SIZE: usize = 224;

/// Decode encoded image bytes into a normalized pixel tensor.
///
/// The image is scaled to cover `image_size` x `image_size` and center-cropped,
/// so aspect ratio is preserved.
pub fn load_image_tensor(
    bytes: &[u8],
    image_size: usize,
    device: &Device,
) -> Result<Tensor, EmbeddingError> {
    if bytes.is_empty() {
        return Err(EmbeddingError::InvalidInput("empty image".to_string()));
    }

    let side = image_size as u32;
    let img = image::load_from_memory(bytes)?
        .resize_to_fill(side, side, FilterType::Triangle)
        .to_rgb8();

    let tensor = Tensor::from_vec(img.into_raw(), (image_size, image_size, 3), device)?
        .permute((2, 0, 1))?
        .to_dtype(DType::F32)?
        .affine(2. / 255., -1.)?
        .unsqueeze(0)?;

    Ok(tensor)
}
