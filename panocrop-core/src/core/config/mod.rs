//! Configuration types, validation and file loading.

pub mod errors;
pub mod loader;
pub mod onnx;
pub mod pipeline;

pub use errors::{ConfigError, ConfigValidator};
pub use loader::{ConfigFormat, ConfigLoader};
pub use onnx::{OrtGraphOptimizationLevel, OrtSessionConfig};
pub use pipeline::{
    AdvisoryConfig, ModelConfig, PipelineConfig, ProposalConfig, ScoringConfig, SelectionConfig,
};
