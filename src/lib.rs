//! # panocrop
//!
//! Crop proposal and composition scoring for panoramic photographs.
//!
//! Given a wide source image, the pipeline proposes candidate sub-regions from
//! saliency, object detection and semantic segmentation, selects the best `top_n` of
//! them, and annotates every crop with a composition score, style labels, rule-based
//! suggestions and optional advice from a remote vision-language model.
//!
//! ## Components
//!
//! - **Saliency**: frequency-tuned (no model) or a learned ONNX network
//! - **Region proposal**: contour boxes, filtered detections and dominant segments
//! - **Selection**: priority ranking with a deterministic fallback layout
//! - **Scoring**: zero-shot CLIP captioning plus a BERT text scorer
//! - **Advisory**: OpenAI-compatible chat completions with both images attached
//!
//! ## Modules
//!
//! * [`pipeline`] - Stages and the [`PanoramaPipeline`] orchestrator
//! * [`models`] - ONNX Runtime backends for the model capabilities
//! * [`context`] - Lazily loaded, shared model handles
//! * [`advisory`] - Remote advice client and scene description loading
//!
//! Configuration, errors, domain types and image processors live in
//! [`panocrop_core`] and are re-exported here.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use panocrop::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load_from_file(Path::new("panocrop.toml"))?;
//! let pipeline = PanoramaPipeline::builder(config).build()?;
//!
//! let result = pipeline.process_path(
//!     Path::new("panorama.jpg"),
//!     &CropRequest::new().top_n(3),
//! )?;
//! for (i, pc) in result.crops.iter().enumerate() {
//!     println!("{} {} {:?}", i, pc.crop.source, pc.analysis.assessment().map(|a| a.score));
//! }
//! # Ok(())
//! # }
//! ```

pub mod advisory;
pub mod context;
pub mod models;
pub mod pipeline;

pub use panocrop_core::{core, domain, processors, utils};

pub use context::ModelContext;
pub use pipeline::{CropRequest, PanoramaPipeline, PanoramaPipelineBuilder, PanoramaResult};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::advisory::{AdviceRequest, ChatAdvisorClient, RemoteAdvisor, read_context_text};
    pub use crate::context::ModelContext;
    pub use crate::pipeline::{
        CropRequest, PanoramaPipeline, PanoramaPipelineBuilder, PanoramaResult, ProcessedCrop,
        records_to_json,
    };
    pub use panocrop_core::core::ConfigLoader;
    pub use panocrop_core::prelude::*;
}
