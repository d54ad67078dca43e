//! Pipeline stages and the panorama orchestrator.
//!
//! * [`proposer`] - candidate regions from saliency, detection and segmentation
//! * [`selector`] - ranking, clamping and backfilling into exactly `top_n` crops
//! * [`scorer`] - caption, style labels and composition score per crop
//! * [`suggestions`] - rule-based shooting advice
//! * [`panorama`] - wires the stages together

pub mod panorama;
pub mod proposer;
pub mod scorer;
pub mod selector;
pub mod suggestions;

pub use panorama::{
    CropRequest, PanoramaPipeline, PanoramaPipelineBuilder, PanoramaResult, ProcessedCrop,
    records_to_json,
};
pub use proposer::{Proposal, RegionProposer, SignalSources, dedup_regions};
pub use scorer::{CompositionScorer, GeometryFeatures};
pub use selector::RegionSelector;
pub use suggestions::SuggestionGenerator;
