//! # panocrop core
//!
//! Core types, configuration, image processors and ONNX Runtime plumbing for the
//! panocrop crop pipeline.
//!
//! ## Modules
//!
//! * [`core`] - Configuration, errors, constants, inference and capability traits
//! * [`domain`] - Regions, crops, detections and assessment results
//! * [`processors`] - Saliency, contours, normalization and similarity helpers
//! * [`utils`] - Image IO and logging setup

pub mod core;
pub mod domain;
pub mod processors;
pub mod utils;

pub use panocrop_derive::ConfigValidator;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{
        ConfigValidator, CropError, CropResult, ImageTextEmbedder, ObjectDetector,
        PipelineConfig, SaliencyModel, SemanticSegmenter, TextScorer,
    };
    pub use crate::domain::{
        BoundingBox, CompositionAssessment, Crop, CropAnalysis, CropRecord, Detection, Region,
        RegionSource, SegmentationMap, StyleLabel,
    };
    pub use crate::processors::{SaliencyDetector, SaliencyMethod};
    pub use crate::utils::load_image;
}
