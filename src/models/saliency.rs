//! Learned saliency network.
//!
//! A small fully convolutional model with a sigmoid head. Input is the image resized to
//! a fixed square and ImageNet-normalized; output is `[1, 1, H, W]` in `[0, 1]`.

use panocrop_core::core::constants::{IMAGENET_MEAN, IMAGENET_STD, SALIENCY_MODEL_INPUT};
use panocrop_core::core::errors::{CropError, CropResult, SimpleError};
use panocrop_core::core::inference::{OrtInfer, RawTensor};
use panocrop_core::core::traits::{CapabilityInfo, CapabilityKind, SaliencyModel};
use panocrop_core::processors::NormalizeImage;
use image::imageops::FilterType;
use image::{GrayImage, RgbImage};

#[derive(Debug)]
pub struct OnnxSaliencyModel {
    inference: OrtInfer,
    normalizer: NormalizeImage,
    input_size: u32,
}

impl OnnxSaliencyModel {
    pub fn new(inference: OrtInfer) -> CropResult<Self> {
        Ok(Self {
            inference,
            normalizer: NormalizeImage::new(IMAGENET_MEAN, IMAGENET_STD)?,
            input_size: SALIENCY_MODEL_INPUT,
        })
    }
}

/// Converts a `[1, 1, H, W]` probability map into an 8-bit image.
pub fn probability_map_to_gray(output: &RawTensor) -> CropResult<GrayImage> {
    let (h, w) = match output.shape.as_slice() {
        [1, 1, h, w] => (*h as u32, *w as u32),
        other => {
            return Err(CropError::post_processing(
                "unexpected saliency output shape",
                SimpleError::new(format!("expected [1, 1, H, W], got {:?}", other)),
            ));
        }
    };
    let pixels = output
        .data
        .iter()
        .map(|&p| (p * 255.0).clamp(0.0, 255.0) as u8)
        .collect();
    GrayImage::from_raw(w, h, pixels).ok_or_else(|| {
        CropError::post_processing(
            "saliency map size mismatch",
            SimpleError::new(format!("{} values for {}x{}", output.data.len(), w, h)),
        )
    })
}

impl SaliencyModel for OnnxSaliencyModel {
    fn predict(&self, image: &RgbImage) -> CropResult<GrayImage> {
        let input = self
            .normalizer
            .resize_and_apply(image, self.input_size, self.input_size);
        let map = probability_map_to_gray(&self.inference.infer_4d(&input)?)?;
        let (width, height) = image.dimensions();
        Ok(image::imageops::resize(&map, width, height, FilterType::Triangle))
    }

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new(
            self.inference.model_name(),
            CapabilityKind::LearnedSaliency,
            "convolutional saliency network",
        )
    }
}
