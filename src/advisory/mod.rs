//! Remote shooting advice from a vision-language chat service.
//!
//! The advisor sees both the full panorama and the crop, and answers in free text.
//! It never fails: every problem is turned into a descriptive string that ends up in
//! the crop record in place of the advice.

pub mod client;
pub mod context_text;

pub use client::ChatAdvisorClient;
pub use context_text::read_context_text;

use image::RgbImage;

/// Placeholder stored when no advisor is configured.
pub const ADVISORY_DISABLED: &str = "Remote shooting advice is disabled";

/// Everything the advisor is told about one crop.
#[derive(Debug, Clone, Copy)]
pub struct AdviceRequest<'a> {
    pub original: &'a RgbImage,
    pub crop: &'a RgbImage,
    /// Region tag such as `object_person`.
    pub region_type: &'a str,
    /// `x1,y1,x2,y2` in the original image.
    pub coordinates: &'a str,
    /// Free-form description of the scene, e.g. camera orientation.
    pub context_text: &'a str,
}

/// Produces shooting advice for a crop.
pub trait RemoteAdvisor: Send + Sync + std::fmt::Debug {
    /// Advice text, or a description of what went wrong.
    fn advise(&self, request: &AdviceRequest<'_>) -> String;
}
