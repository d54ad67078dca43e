//! Image normalization into NCHW model input tensors.

use crate::core::errors::{CropError, CropResult};
use image::{RgbImage, imageops::FilterType};
use ndarray::Array4;

/// Per-channel `(pixel * scale - mean) / std` normalization.
///
/// Stored as `alpha = scale / std` and `beta = -mean / std` so each pixel costs one
/// multiply-add.
#[derive(Debug, Clone)]
pub struct NormalizeImage {
    alpha: [f32; 3],
    beta: [f32; 3],
}

impl NormalizeImage {
    /// Creates a normalizer for 8-bit RGB input.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any standard deviation is not positive.
    pub fn new(mean: [f32; 3], std: [f32; 3]) -> CropResult<Self> {
        let scale = 1.0 / 255.0;
        for (i, &s) in std.iter().enumerate() {
            if s <= 0.0 {
                return Err(CropError::config_error(format!(
                    "Standard deviation at index {i} must be greater than 0, got {s}"
                )));
            }
        }
        Ok(Self {
            alpha: [scale / std[0], scale / std[1], scale / std[2]],
            beta: [-mean[0] / std[0], -mean[1] / std[1], -mean[2] / std[2]],
        })
    }

    /// Normalizes `image` into a `[1, 3, H, W]` tensor.
    pub fn apply(&self, image: &RgbImage) -> Array4<f32> {
        let (w, h) = image.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, h as usize, w as usize));
        for (x, y, px) in image.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = px[c] as f32 * self.alpha[c] + self.beta[c];
            }
        }
        tensor
    }

    /// Resizes `image` bilinearly to `width` x `height`, then normalizes it.
    pub fn resize_and_apply(&self, image: &RgbImage, width: u32, height: u32) -> Array4<f32> {
        if image.dimensions() == (width, height) {
            return self.apply(image);
        }
        let resized = image::imageops::resize(image, width, height, FilterType::Triangle);
        self.apply(&resized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::{IMAGENET_MEAN, IMAGENET_STD};
    use image::Rgb;

    #[test]
    fn test_rejects_non_positive_std() {
        assert!(NormalizeImage::new([0.5; 3], [0.2, 0.0, 0.2]).is_err());
    }

    #[test]
    fn test_imagenet_normalization_values() -> CropResult<()> {
        let norm = NormalizeImage::new(IMAGENET_MEAN, IMAGENET_STD)?;
        let image = RgbImage::from_pixel(2, 2, Rgb([255, 0, 128]));
        let tensor = norm.apply(&image);
        assert_eq!(tensor.shape(), &[1, 3, 2, 2]);
        let r = (1.0 - 0.485) / 0.229;
        let g = (0.0 - 0.456) / 0.224;
        assert!((tensor[[0, 0, 1, 1]] - r).abs() < 1e-4);
        assert!((tensor[[0, 1, 0, 0]] - g).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn test_resize_changes_spatial_shape() -> CropResult<()> {
        let norm = NormalizeImage::new(IMAGENET_MEAN, IMAGENET_STD)?;
        let tensor = norm.resize_and_apply(&RgbImage::new(300, 100), 256, 256);
        assert_eq!(tensor.shape(), &[1, 3, 256, 256]);
        Ok(())
    }
}
