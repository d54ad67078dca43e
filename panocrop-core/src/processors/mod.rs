//! Image processing building blocks used by the pipeline stages.

pub mod color;
pub mod contours;
pub mod normalization;
pub mod saliency;
pub mod similarity;

pub use contours::{ContourRect, external_contours, otsu_binarize, polygon_area};
pub use normalization::NormalizeImage;
pub use saliency::{SaliencyDetector, SaliencyMethod, foreground_ratio, frequency_tuned_saliency};
pub use similarity::{cosine_similarity, ranked_indices, scaled_similarity_probs, softmax};
