//! The core module of the crop pipeline.
//!
//! This module contains the fundamental components shared by every stage:
//! - Configuration types, validation and loading
//! - Constants used throughout the pipeline
//! - Error handling
//! - ONNX Runtime session pooling
//! - Traits describing the consumed model capabilities

pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;
pub mod traits;

pub use config::{
    AdvisoryConfig, ConfigError, ConfigLoader, ConfigValidator, ModelConfig, OrtSessionConfig,
    PipelineConfig, ProposalConfig, ScoringConfig, SelectionConfig,
};
pub use constants::*;
pub use errors::{CropError, CropResult, ProcessingStage, SimpleError};
pub use inference::{OrtInfer, RawTensor};
pub use traits::{
    CapabilityInfo, CapabilityKind, ImageTextEmbedder, ObjectDetector, SaliencyModel,
    SemanticSegmenter, TextScorer,
};
