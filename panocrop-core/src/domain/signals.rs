//! Outputs of the detector and segmenter capabilities.

use crate::core::errors::{CropError, CropResult};
use image::GrayImage;

/// One object detection in source-image pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub class_name: String,
    pub confidence: f32,
}

impl Detection {
    pub fn new(
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        class_name: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            class_name: class_name.into(),
            confidence,
        }
    }

    /// Box corners truncated toward zero, as integer pixel positions.
    pub fn pixel_box(&self) -> (i32, i32, i32, i32) {
        (
            self.x1 as i32,
            self.y1 as i32,
            self.x2 as i32,
            self.y2 as i32,
        )
    }
}

/// Per-pixel class ids, row-major, with the same size as the source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMap {
    width: u32,
    height: u32,
    labels: Vec<u32>,
}

impl SegmentationMap {
    pub fn new(width: u32, height: u32, labels: Vec<u32>) -> CropResult<Self> {
        let expected = width as usize * height as usize;
        if labels.len() != expected {
            return Err(CropError::validation_error(
                "SegmentationMap",
                "labels",
                &format!("{} entries for {}x{}", expected, width, height),
                &labels.len().to_string(),
            ));
        }
        Ok(Self {
            width,
            height,
            labels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> u32 {
        self.labels[y as usize * self.width as usize + x as usize]
    }

    /// Pixel count per class id, sorted by class id.
    pub fn class_counts(&self) -> Vec<(u32, usize)> {
        let mut counts = std::collections::BTreeMap::new();
        for &label in &self.labels {
            *counts.entry(label).or_insert(0usize) += 1;
        }
        counts.into_iter().collect()
    }

    /// Binary mask (255 for `class_id`, 0 elsewhere).
    pub fn class_mask(&self, class_id: u32) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([if self.get(x, y) == class_id { 255 } else { 0 }])
        })
    }
}
