//! Model capabilities consumed by the crop pipeline.
//!
//! Each capability is an object-safe trait so the pipeline can hold it as
//! `Arc<dyn Trait>`: the ONNX backends in the `panocrop` crate implement them, and
//! tests substitute deterministic fakes.

use crate::core::errors::CropResult;
use crate::domain::{Detection, SegmentationMap};
use image::{GrayImage, RgbImage};
use std::fmt::{self, Debug};

/// Which capability a backend provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    ObjectDetection,
    SemanticSegmentation,
    ImageTextEmbedding,
    TextScoring,
    LearnedSaliency,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CapabilityKind::ObjectDetection => "object detection",
            CapabilityKind::SemanticSegmentation => "semantic segmentation",
            CapabilityKind::ImageTextEmbedding => "image-text embedding",
            CapabilityKind::TextScoring => "text scoring",
            CapabilityKind::LearnedSaliency => "learned saliency",
        };
        f.write_str(name)
    }
}

/// Information about a capability backend.
#[derive(Debug, Clone)]
pub struct CapabilityInfo {
    pub model_name: String,
    pub kind: CapabilityKind,
    pub description: String,
}

impl CapabilityInfo {
    pub fn new(
        model_name: impl Into<String>,
        kind: CapabilityKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            kind,
            description: description.into(),
        }
    }
}

/// Finds objects and returns their boxes in source-image coordinates.
pub trait ObjectDetector: Send + Sync + Debug {
    fn detect_objects(&self, image: &RgbImage) -> CropResult<Vec<Detection>>;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new(
            std::any::type_name::<Self>(),
            CapabilityKind::ObjectDetection,
            "",
        )
    }
}

/// Labels every pixel with a class id. The map has the image's dimensions.
pub trait SemanticSegmenter: Send + Sync + Debug {
    fn segment(&self, image: &RgbImage) -> CropResult<SegmentationMap>;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new(
            std::any::type_name::<Self>(),
            CapabilityKind::SemanticSegmentation,
            "",
        )
    }
}

/// Embeds images and texts into a shared space compared by cosine similarity.
pub trait ImageTextEmbedder: Send + Sync + Debug {
    fn embed_image(&self, image: &RgbImage) -> CropResult<Vec<f32>>;

    /// One vector per input text, in input order.
    fn embed_text(&self, texts: &[String]) -> CropResult<Vec<Vec<f32>>>;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new(
            std::any::type_name::<Self>(),
            CapabilityKind::ImageTextEmbedding,
            "",
        )
    }
}

/// Maps a caption to a raw composition quality score.
pub trait TextScorer: Send + Sync + Debug {
    fn score_text(&self, text: &str) -> CropResult<f32>;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new(
            std::any::type_name::<Self>(),
            CapabilityKind::TextScoring,
            "",
        )
    }
}

/// Learned saliency network. Returns a map with the image's dimensions.
pub trait SaliencyModel: Send + Sync + Debug {
    fn predict(&self, image: &RgbImage) -> CropResult<GrayImage>;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new(
            std::any::type_name::<Self>(),
            CapabilityKind::LearnedSaliency,
            "",
        )
    }
}
