//! Domain types shared by the pipeline stages.

pub mod assessment;
pub mod region;
pub mod signals;

pub use assessment::{CompositionAssessment, CropAnalysis, CropRecord, StyleLabel};
pub use region::{BoundingBox, Crop, Region, RegionSource};
pub use signals::{Detection, SegmentationMap};
