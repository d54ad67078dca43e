//! YOLOv5-style object detector.
//!
//! The model takes a `[1, 3, S, S]` RGB tensor scaled to `[0, 1]` and returns
//! `[1, N, 5 + C]` rows of `cx, cy, w, h, objectness, class scores...` in input
//! pixels. Boxes are rescaled to the source image and filtered with class-wise NMS.

use panocrop_core::core::constants::{
    COCO_CLASSES, DETECTOR_INPUT, DETECTOR_MIN_OBJECTNESS, DETECTOR_NMS_IOU,
};
use panocrop_core::core::errors::{CropError, CropResult};
use panocrop_core::core::inference::{OrtInfer, RawTensor};
use panocrop_core::core::traits::{CapabilityInfo, CapabilityKind, ObjectDetector};
use panocrop_core::domain::Detection;
use panocrop_core::processors::NormalizeImage;
use image::RgbImage;
use std::path::Path;
use tracing::debug;

/// ONNX object detector producing [`Detection`]s in source-image pixels.
#[derive(Debug)]
pub struct YoloObjectDetector {
    inference: OrtInfer,
    normalizer: NormalizeImage,
    labels: Vec<String>,
    input_size: u32,
    score_threshold: f32,
    nms_iou: f32,
}

impl YoloObjectDetector {
    pub fn new(inference: OrtInfer, labels: Vec<String>) -> CropResult<Self> {
        Ok(Self {
            inference,
            normalizer: NormalizeImage::new([0.0; 3], [1.0; 3])?,
            labels,
            input_size: DETECTOR_INPUT,
            score_threshold: DETECTOR_MIN_OBJECTNESS,
            nms_iou: DETECTOR_NMS_IOU,
        })
    }

    /// COCO-80 class names.
    pub fn coco_labels() -> Vec<String> {
        COCO_CLASSES.iter().map(|c| c.to_string()).collect()
    }

    /// Reads class names from a text file, one per line. Blank lines are skipped.
    pub fn load_labels(path: &Path) -> CropResult<Vec<String>> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CropError::model_load_error(path, "failed to read detector labels", None, Some(e))
        })?;
        let labels: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        if labels.is_empty() {
            return Err(CropError::model_load_error(
                path,
                "detector labels file is empty",
                None,
                None::<std::io::Error>,
            ));
        }
        Ok(labels)
    }

    /// Decodes raw `[1, N, 5 + C]` rows into detections for a `width` x `height`
    /// image, before NMS.
    fn decode(&self, output: &RawTensor, width: u32, height: u32) -> CropResult<Vec<Detection>> {
        let row_len = match output.shape.as_slice() {
            [1, _, len] if *len > 5 => *len,
            other => {
                return Err(CropError::post_processing(
                    "unexpected detector output shape",
                    panocrop_core::core::errors::SimpleError::new(format!(
                        "expected [1, N, 5 + C], got {:?}",
                        other
                    )),
                ));
            }
        };
        let sx = width as f32 / self.input_size as f32;
        let sy = height as f32 / self.input_size as f32;
        let (max_x, max_y) = (width as f32, height as f32);

        let detections = output
            .data
            .chunks_exact(row_len)
            .filter_map(|row| {
                let objectness = row[4];
                let (class_id, class_score) = row[5..]
                    .iter()
                    .copied()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(&b.1))?;
                let confidence = objectness * class_score;
                if confidence < self.score_threshold {
                    return None;
                }
                let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
                let class_name = self
                    .labels
                    .get(class_id)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{}", class_id));
                Some(Detection::new(
                    ((cx - w / 2.0) * sx).clamp(0.0, max_x),
                    ((cy - h / 2.0) * sy).clamp(0.0, max_y),
                    ((cx + w / 2.0) * sx).clamp(0.0, max_x),
                    ((cy + h / 2.0) * sy).clamp(0.0, max_y),
                    class_name,
                    confidence,
                ))
            })
            .collect();
        Ok(detections)
    }
}

fn iou(a: &Detection, b: &Detection) -> f32 {
    let ix = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let iy = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = ix * iy;
    let area = |d: &Detection| (d.x2 - d.x1).max(0.0) * (d.y2 - d.y1).max(0.0);
    let union = area(a) + area(b) - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

/// Greedy per-class non-maximum suppression, highest confidence first.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = kept
            .iter()
            .any(|k| k.class_name == candidate.class_name && iou(k, &candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

impl ObjectDetector for YoloObjectDetector {
    fn detect_objects(&self, image: &RgbImage) -> CropResult<Vec<Detection>> {
        let input = self
            .normalizer
            .resize_and_apply(image, self.input_size, self.input_size);
        let output = self.inference.infer_4d(&input)?;
        let candidates = self.decode(&output, image.width(), image.height())?;
        let candidate_count = candidates.len();
        let detections = non_max_suppression(candidates, self.nms_iou);
        debug!(candidate_count, kept = detections.len(), "object detection");
        Ok(detections)
    }

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new(
            self.inference.model_name(),
            CapabilityKind::ObjectDetection,
            format!("YOLO detector, {} classes", self.labels.len()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nms_is_class_wise() {
        let detections = vec![
            Detection::new(0.0, 0.0, 100.0, 100.0, "person", 0.8),
            Detection::new(5.0, 5.0, 100.0, 100.0, "person", 0.9),
            Detection::new(5.0, 5.0, 100.0, 100.0, "dog", 0.7),
            Detection::new(300.0, 300.0, 400.0, 400.0, "person", 0.5),
        ];
        let kept = non_max_suppression(detections, 0.45);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].class_name, "dog");
    }

    #[test]
    fn test_iou_of_disjoint_boxes_is_zero() {
        let a = Detection::new(0.0, 0.0, 10.0, 10.0, "a", 1.0);
        let b = Detection::new(20.0, 20.0, 30.0, 30.0, "a", 1.0);
        assert_eq!(iou(&a, &b), 0.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_labels_skips_blank_lines() -> CropResult<()> {
        let path = std::env::temp_dir().join(format!("panocrop_labels_{}.txt", std::process::id()));
        std::fs::write(&path, "person\n\n  dog \ncar\n")?;
        let labels = YoloObjectDetector::load_labels(&path)?;
        std::fs::remove_file(&path)?;
        assert_eq!(labels, vec!["person", "dog", "car"]);
        Ok(())
    }

    #[test]
    fn test_coco_labels() {
        let labels = YoloObjectDetector::coco_labels();
        assert_eq!(labels.len(), 80);
        assert_eq!(labels[0], "person");
    }
}
