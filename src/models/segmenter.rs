//! DeepLabV3-style semantic segmenter.

use panocrop_core::core::constants::{IMAGENET_MEAN, IMAGENET_STD, SEGMENTATION_MODEL_INPUT};
use panocrop_core::core::errors::{CropError, CropResult, SimpleError};
use panocrop_core::core::inference::{OrtInfer, RawTensor};
use panocrop_core::core::traits::{CapabilityInfo, CapabilityKind, SemanticSegmenter};
use panocrop_core::domain::SegmentationMap;
use panocrop_core::processors::NormalizeImage;
use image::RgbImage;

/// ONNX segmenter with `[1, C, H, W]` logits output.
#[derive(Debug)]
pub struct DeepLabSegmenter {
    inference: OrtInfer,
    normalizer: NormalizeImage,
    input_size: u32,
}

impl DeepLabSegmenter {
    pub fn new(inference: OrtInfer) -> CropResult<Self> {
        Ok(Self {
            inference,
            normalizer: NormalizeImage::new(IMAGENET_MEAN, IMAGENET_STD)?,
            input_size: SEGMENTATION_MODEL_INPUT,
        })
    }
}

/// Per-pixel argmax over the class axis of `[1, C, H, W]` logits.
///
/// Returns the label grid with its width and height.
pub fn argmax_labels(logits: &RawTensor) -> CropResult<(u32, u32, Vec<u32>)> {
    let (classes, h, w) = match logits.shape.as_slice() {
        [1, c, h, w] if *c > 0 => (*c, *h, *w),
        other => {
            return Err(CropError::post_processing(
                "unexpected segmentation output shape",
                SimpleError::new(format!("expected [1, C, H, W], got {:?}", other)),
            ));
        }
    };
    let plane = h * w;
    let labels = (0..plane)
        .map(|i| {
            (0..classes)
                .map(|c| logits.data[c * plane + i])
                .enumerate()
                .fold((0usize, f32::NEG_INFINITY), |best, (c, v)| {
                    if v > best.1 { (c, v) } else { best }
                })
                .0 as u32
        })
        .collect();
    Ok((w as u32, h as u32, labels))
}

/// Nearest-neighbour resize of a label grid.
pub fn resize_labels(
    labels: &[u32],
    src_w: u32,
    src_h: u32,
    dst_w: u32,
    dst_h: u32,
) -> Vec<u32> {
    let mut out = Vec::with_capacity(dst_w as usize * dst_h as usize);
    for y in 0..dst_h {
        let sy = ((y as u64 * src_h as u64) / dst_h as u64) as usize;
        for x in 0..dst_w {
            let sx = ((x as u64 * src_w as u64) / dst_w as u64) as usize;
            out.push(labels[sy * src_w as usize + sx]);
        }
    }
    out
}

impl SemanticSegmenter for DeepLabSegmenter {
    fn segment(&self, image: &RgbImage) -> CropResult<SegmentationMap> {
        let input = self
            .normalizer
            .resize_and_apply(image, self.input_size, self.input_size);
        let logits = self.inference.infer_4d(&input)?;
        let (w, h, labels) = argmax_labels(&logits)?;
        let (width, height) = image.dimensions();
        SegmentationMap::new(width, height, resize_labels(&labels, w, h, width, height))
    }

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new(
            self.inference.model_name(),
            CapabilityKind::SemanticSegmentation,
            "DeepLabV3 segmenter",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_labels() -> CropResult<()> {
        // two classes over a 1x2 grid
        let logits = RawTensor::new(vec![1, 2, 1, 2], vec![0.9, 0.1, 0.2, 0.8])?;
        let (w, h, labels) = argmax_labels(&logits)?;
        assert_eq!((w, h), (2, 1));
        assert_eq!(labels, vec![0, 1]);
        Ok(())
    }

    #[test]
    fn test_argmax_rejects_bad_shape() -> CropResult<()> {
        let logits = RawTensor::new(vec![4], vec![0.0; 4])?;
        assert!(argmax_labels(&logits).is_err());
        Ok(())
    }

    #[test]
    fn test_resize_labels_nearest() {
        let labels = vec![1, 2, 3, 4];
        let out = resize_labels(&labels, 2, 2, 4, 2);
        assert_eq!(out, vec![1, 1, 2, 2, 3, 3, 4, 4]);
    }
}
