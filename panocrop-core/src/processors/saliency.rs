//! Saliency map computation.
//!
//! # Stage Definition
//!
//! - Inputs: an RGB image.
//! - Outputs: a single-channel map of the same size, values in `[0, 255]`.
//! - Invariants: a perfectly uniform image yields an all-zero map for the
//!   frequency-tuned method.

use crate::core::errors::{CropError, CropResult, ProcessingStage, SimpleError};
use crate::core::traits::SaliencyModel;
use crate::processors::color::rgb_to_lab8;
use image::{GrayImage, Luma, RgbImage, imageops::FilterType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Available saliency backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaliencyMethod {
    /// Lab distance from the image mean. No model needed.
    #[default]
    #[serde(rename = "frequency_tuned")]
    FrequencyTuned,
    /// Small convolutional network loaded from ONNX.
    #[serde(rename = "learned", alias = "srm")]
    Learned,
}

impl SaliencyMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaliencyMethod::FrequencyTuned => "frequency_tuned",
            SaliencyMethod::Learned => "learned",
        }
    }
}

impl fmt::Display for SaliencyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaliencyMethod {
    type Err = CropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frequency_tuned" | "ft" => Ok(SaliencyMethod::FrequencyTuned),
            "learned" | "srm" => Ok(SaliencyMethod::Learned),
            other => Err(CropError::invalid_input(format!(
                "unknown saliency method '{}', expected 'frequency_tuned' or 'srm'",
                other
            ))),
        }
    }
}

/// Frequency-tuned saliency.
///
/// Each pixel's value is the Euclidean distance between its 8-bit Lab triple and the
/// per-channel image means, min-max scaled to `[0, 255]` and truncated.
pub fn frequency_tuned_saliency(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let pixel_count = (width as usize) * (height as usize);
    if pixel_count == 0 {
        return GrayImage::new(width, height);
    }

    let lab = rgb_to_lab8(image);
    let mut sums = [0f64; 3];
    for px in lab.pixels() {
        for (sum, &c) in sums.iter_mut().zip(px.0.iter()) {
            *sum += c as f64;
        }
    }
    let means = sums.map(|s| s / pixel_count as f64);

    let distances: Vec<f64> = lab
        .pixels()
        .map(|px| {
            px.0.iter()
                .zip(means.iter())
                .map(|(&c, &m)| (c as f64 - m).powi(2))
                .sum::<f64>()
                .sqrt()
        })
        .collect();

    let (min, max) = distances
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &d| {
            (lo.min(d), hi.max(d))
        });
    let range = max - min;
    if range <= f64::EPSILON {
        return GrayImage::new(width, height);
    }

    let values: Vec<u8> = distances
        .iter()
        .map(|&d| ((d - min) / range * 255.0) as u8)
        .collect();
    GrayImage::from_raw(width, height, values).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Computes saliency maps with the configured backend.
#[derive(Debug, Clone)]
pub struct SaliencyDetector {
    method: SaliencyMethod,
    model: Option<Arc<dyn SaliencyModel>>,
}

impl Default for SaliencyDetector {
    fn default() -> Self {
        Self::frequency_tuned()
    }
}

impl SaliencyDetector {
    pub fn frequency_tuned() -> Self {
        Self {
            method: SaliencyMethod::FrequencyTuned,
            model: None,
        }
    }

    pub fn learned(model: Arc<dyn SaliencyModel>) -> Self {
        Self {
            method: SaliencyMethod::Learned,
            model: Some(model),
        }
    }

    pub fn method(&self) -> SaliencyMethod {
        self.method
    }

    /// Computes the saliency map of `image`.
    ///
    /// A learned map whose size differs from the image is resized back to it.
    pub fn detect(&self, image: &RgbImage) -> CropResult<GrayImage> {
        let map = match (self.method, &self.model) {
            (SaliencyMethod::FrequencyTuned, _) => frequency_tuned_saliency(image),
            (SaliencyMethod::Learned, Some(model)) => {
                let map = model.predict(image)?;
                if map.dimensions() != image.dimensions() {
                    image::imageops::resize(&map, image.width(), image.height(), FilterType::Triangle)
                } else {
                    map
                }
            }
            (SaliencyMethod::Learned, None) => {
                return Err(CropError::processing_error(
                    ProcessingStage::Saliency,
                    "learned saliency selected without a model",
                    SimpleError::new("saliency model not configured"),
                ));
            }
        };
        debug!(
            method = %self.method,
            width = map.width(),
            height = map.height(),
            "computed saliency map"
        );
        Ok(map)
    }
}

/// Fraction of pixels in `map` that are non-zero.
pub fn foreground_ratio(map: &GrayImage) -> f32 {
    let total = map.width() as usize * map.height() as usize;
    if total == 0 {
        return 0.0;
    }
    let salient = map.pixels().filter(|&&Luma([v])| v > 0).count();
    salient as f32 / total as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[derive(Debug)]
    struct HalfMap;

    impl SaliencyModel for HalfMap {
        fn predict(&self, image: &RgbImage) -> CropResult<GrayImage> {
            Ok(GrayImage::from_pixel(
                image.width() / 2,
                image.height() / 2,
                Luma([200]),
            ))
        }
    }

    #[test]
    fn test_uniform_image_gives_zero_map() {
        let image = RgbImage::from_pixel(40, 30, Rgb([120, 60, 200]));
        let map = frequency_tuned_saliency(&image);
        assert_eq!(map.dimensions(), (40, 30));
        assert!(map.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_bright_square_is_salient() {
        let mut image = RgbImage::new(64, 64);
        for y in 20..40 {
            for x in 20..40 {
                image.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let map = frequency_tuned_saliency(&image);
        assert_eq!(map.get_pixel(30, 30)[0], 255);
        assert_eq!(map.get_pixel(2, 2)[0], 0);
    }

    #[test]
    fn test_method_parsing() -> CropResult<()> {
        assert_eq!("srm".parse::<SaliencyMethod>()?, SaliencyMethod::Learned);
        assert_eq!(
            "frequency_tuned".parse::<SaliencyMethod>()?,
            SaliencyMethod::FrequencyTuned
        );
        assert!("spectral".parse::<SaliencyMethod>().is_err());
        Ok(())
    }

    #[test]
    fn test_learned_map_resized_to_image() -> CropResult<()> {
        let detector = SaliencyDetector::learned(Arc::new(HalfMap));
        let map = detector.detect(&RgbImage::new(50, 40))?;
        assert_eq!(map.dimensions(), (50, 40));
        Ok(())
    }

    #[test]
    fn test_foreground_ratio() {
        let mut map = GrayImage::new(10, 10);
        for x in 0..10 {
            map.put_pixel(x, 0, Luma([255]));
        }
        assert!((foreground_ratio(&map) - 0.1).abs() < 1e-6);
    }
}
