//! Composition scoring of individual crops.
//!
//! # Stage Definition
//!
//! - Inputs: one crop image.
//! - Outputs: [`CropAnalysis`], either an assessment (caption, styles, score in
//!   `[0, 10]`, explanation, suggestions) or the error that stopped it.
//! - Invariants: never returns an error to the caller; failures are reported per crop.
//!
//! The caption and style labels come from zero-shot matching against a fixed
//! vocabulary in a shared image-text embedding space. The base score comes from a
//! text scorer applied to the caption and is then adjusted by three geometric cues
//! measured on the crop's own saliency mask.

use super::suggestions::SuggestionGenerator;
use panocrop_core::core::config::ScoringConfig;
use panocrop_core::core::errors::{CropError, CropResult};
use panocrop_core::core::traits::{ImageTextEmbedder, TextScorer};
use panocrop_core::domain::{CompositionAssessment, CropAnalysis, StyleLabel};
use panocrop_core::processors::{
    foreground_ratio, frequency_tuned_saliency, otsu_binarize, ranked_indices,
    scaled_similarity_probs,
};
use image::{GrayImage, Luma, RgbImage};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Composition concepts, in pairs of opposites where one exists.
pub const COMPOSITION_CONCEPTS: [&str; 25] = [
    "good composition",
    "poor composition",
    "balanced composition",
    "unbalanced composition",
    "prominent subject",
    "subject not prominent",
    "adequate negative space",
    "excessive negative space",
    "good depth",
    "lacking depth",
    "clear visual guidance",
    "cluttered visual guidance",
    "golden ratio composition",
    "not golden ratio",
    "symmetric composition",
    "asymmetric composition",
    "foreground blur",
    "no foreground",
    "clean background",
    "cluttered background",
    "color harmony",
    "color clash",
    "balanced contrast",
    "overexposed",
    "underexposed",
];

pub const CONCEPT_TEMPLATES: [&str; 4] = [
    "a photo with {}",
    "an image with {}",
    "a picture with {}",
    "a shot with {}",
];

pub const STYLE_LABELS: [&str; 11] = [
    "minimalist",
    "complex",
    "symmetric",
    "asymmetric",
    "dynamic",
    "static",
    "compact",
    "loose",
    "balanced",
    "high-contrast",
    "soft",
];

const STYLE_TEMPLATE: &str = "a photo with {} style";

const IDEAL_ASPECT_RATIOS: [f64; 5] = [16.0 / 9.0, 4.0 / 3.0, 1.0, 3.0 / 4.0, 9.0 / 16.0];

/// Concept-major prompt list: all templates of the first concept, then the next.
fn concept_prompts() -> Vec<String> {
    COMPOSITION_CONCEPTS
        .iter()
        .flat_map(|concept| {
            CONCEPT_TEMPLATES
                .iter()
                .map(move |template| template.replace("{}", concept))
        })
        .collect()
}

fn style_prompts() -> Vec<String> {
    STYLE_LABELS
        .iter()
        .map(|style| STYLE_TEMPLATE.replace("{}", style))
        .collect()
}

/// Geometric measurements of a crop's saliency mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryFeatures {
    /// Share of the crop covered by salient pixels.
    pub subject_ratio: f64,
    /// Width over height.
    pub aspect_ratio: f64,
    /// Share of the salient pixels that fall inside the edge band.
    pub edge_ratio: f64,
}

impl GeometryFeatures {
    /// Measures `crop` using its frequency-tuned saliency binarized with Otsu's level.
    ///
    /// The edge band is `floor(band_fraction * min(width, height))` pixels wide on
    /// every side.
    pub fn measure(crop: &RgbImage, band_fraction: f32) -> Self {
        let (width, height) = crop.dimensions();
        let (_, mask) = otsu_binarize(&frequency_tuned_saliency(crop));
        let margin = (band_fraction as f64 * width.min(height) as f64).floor() as u32;
        Self {
            subject_ratio: foreground_ratio(&mask) as f64,
            aspect_ratio: width as f64 / height.max(1) as f64,
            edge_ratio: edge_ratio(&mask, margin),
        }
    }
}

/// Salient pixels inside a `margin`-wide border over all salient pixels.
///
/// An empty border yields zero.
pub fn edge_ratio(mask: &GrayImage, margin: u32) -> f64 {
    let (width, height) = mask.dimensions();
    let in_band = |x: u32, y: u32| {
        x < margin || y < margin || x + margin >= width || y + margin >= height
    };
    let (mut salient, mut salient_in_band) = (0u64, 0u64);
    for (x, y, &Luma([v])) in mask.enumerate_pixels() {
        if v > 0 {
            salient += 1;
            if margin > 0 && in_band(x, y) {
                salient_in_band += 1;
            }
        }
    }
    salient_in_band as f64 / (salient as f64 + 1e-6)
}

/// Bonus for a subject that fills a moderate share of the frame.
pub fn subject_bonus(ratio: f64) -> f64 {
    if ratio > 0.3 && ratio < 0.7 {
        1.2
    } else if (ratio > 0.2 && ratio <= 0.3) || (ratio >= 0.7 && ratio < 0.8) {
        0.5
    } else {
        -0.8
    }
}

/// `(0.5 - d) * 3`, where `d` is the distance to the closest common aspect ratio.
pub fn aspect_bonus(aspect_ratio: f64) -> f64 {
    let min_diff = IDEAL_ASPECT_RATIOS
        .iter()
        .map(|r| (aspect_ratio - r).abs())
        .fold(f64::INFINITY, f64::min);
    (0.5 - min_diff) * 3.0
}

/// Fails unless every prompt embedding has the image embedding's dimension.
fn check_dimensions(image_embedding: &[f32], prompts: &[Vec<f32>]) -> CropResult<()> {
    match prompts.iter().find(|p| p.len() != image_embedding.len()) {
        Some(prompt) => Err(CropError::scoring(format!(
            "image embedding has {} dimensions but text embedding has {}",
            image_embedding.len(),
            prompt.len()
        ))),
        None => Ok(()),
    }
}

/// Clamps to `[0, 10]` and rounds to one decimal, ties to even.
pub fn finalize_score(score: f64) -> f32 {
    ((score.clamp(0.0, 10.0) * 10.0).round_ties_even() / 10.0) as f32
}

/// Scores crops and explains the score.
pub struct CompositionScorer {
    embedder: Arc<dyn ImageTextEmbedder>,
    text_scorer: Arc<dyn TextScorer>,
    suggestions: SuggestionGenerator,
    config: ScoringConfig,
    concept_embeddings: OnceCell<Vec<Vec<f32>>>,
    style_embeddings: OnceCell<Vec<Vec<f32>>>,
}

impl std::fmt::Debug for CompositionScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionScorer")
            .field("embedder", &self.embedder.info().model_name)
            .field("text_scorer", &self.text_scorer.info().model_name)
            .field("config", &self.config)
            .finish()
    }
}

impl CompositionScorer {
    pub fn new(
        embedder: Arc<dyn ImageTextEmbedder>,
        text_scorer: Arc<dyn TextScorer>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            embedder,
            text_scorer,
            suggestions: SuggestionGenerator::new(),
            config,
            concept_embeddings: OnceCell::new(),
            style_embeddings: OnceCell::new(),
        }
    }

    fn prompt_embeddings<'a>(
        &self,
        cell: &'a OnceCell<Vec<Vec<f32>>>,
        prompts: Vec<String>,
    ) -> CropResult<&'a Vec<Vec<f32>>> {
        cell.get_or_try_init(|| {
            let embeddings = self.embedder.embed_text(&prompts)?;
            if embeddings.len() != prompts.len() {
                return Err(CropError::scoring(format!(
                    "embedder returned {} text embeddings for {} prompts",
                    embeddings.len(),
                    prompts.len()
                )));
            }
            Ok(embeddings)
        })
    }

    /// Up to `caption_concepts` distinct concepts, best match first, joined by `", "`.
    pub fn caption(&self, image_embedding: &[f32]) -> CropResult<String> {
        let prompts = self.prompt_embeddings(&self.concept_embeddings, concept_prompts())?;
        check_dimensions(image_embedding, prompts)?;
        let probs = scaled_similarity_probs(image_embedding, prompts, self.config.logit_scale);

        let mut seen = HashSet::new();
        let concepts: Vec<&str> = ranked_indices(&probs)
            .into_iter()
            .map(|i| COMPOSITION_CONCEPTS[i / CONCEPT_TEMPLATES.len()])
            .filter(|concept| seen.insert(*concept))
            .take(self.config.caption_concepts)
            .collect();
        Ok(concepts.join(", "))
    }

    /// The `style_count` best matching styles with their softmax confidences.
    pub fn styles(&self, image_embedding: &[f32]) -> CropResult<Vec<StyleLabel>> {
        let prompts = self.prompt_embeddings(&self.style_embeddings, style_prompts())?;
        check_dimensions(image_embedding, prompts)?;
        let probs = scaled_similarity_probs(image_embedding, prompts, self.config.logit_scale);
        Ok(ranked_indices(&probs)
            .into_iter()
            .take(self.config.style_count)
            .map(|i| StyleLabel::new(STYLE_LABELS[i], probs[i]))
            .collect())
    }

    /// Sum of the subject, aspect and edge adjustments.
    pub fn geometric_adjustment(&self, features: &GeometryFeatures) -> f64 {
        let edge = if features.edge_ratio > self.config.edge_ratio_threshold as f64 {
            -(self.config.edge_penalty as f64)
        } else {
            0.0
        };
        subject_bonus(features.subject_ratio) + aspect_bonus(features.aspect_ratio) + edge
    }

    /// Text score of `caption` adjusted by the geometry of `crop`.
    pub fn score(&self, caption: &str, crop: &RgbImage) -> CropResult<f32> {
        let base = self.text_scorer.score_text(caption)? as f64;
        if !base.is_finite() {
            return Err(CropError::scoring(format!(
                "text scorer returned a non-finite score ({})",
                base
            )));
        }
        let features = GeometryFeatures::measure(crop, self.config.edge_band_fraction);
        let adjustment = self.geometric_adjustment(&features);
        debug!(base, adjustment, ?features, "composition score");
        Ok(finalize_score(base + adjustment))
    }

    fn try_assess(&self, crop: &RgbImage) -> CropResult<CompositionAssessment> {
        let embedding = self.embedder.embed_image(crop)?;
        let caption = self.caption(&embedding)?;
        let style_labels = self.styles(&embedding)?;
        let score = self.score(&caption, crop)?;
        let suggestions = self.suggestions.suggest(&caption, &style_labels);
        Ok(CompositionAssessment {
            score,
            style_labels,
            explanation: format!("Image analysis shows: {}", caption),
            caption,
            suggestions,
        })
    }

    /// Assesses one crop. Errors are logged and returned as [`CropAnalysis::Failed`].
    pub fn assess(&self, crop: &RgbImage) -> CropAnalysis {
        match self.try_assess(crop) {
            Ok(assessment) => CropAnalysis::Assessed(assessment),
            Err(e) => {
                warn!(error = %e, "composition analysis failed");
                CropAnalysis::Failed {
                    error: format!("Composition analysis failed: {}", e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Images embed as `[1, 0]`; texts mentioning `favored` embed as `[1, 0]`, the
    /// rest as `[0, 1]`.
    #[derive(Debug)]
    struct KeywordEmbedder {
        favored: &'static str,
    }

    impl ImageTextEmbedder for KeywordEmbedder {
        fn embed_image(&self, _image: &RgbImage) -> CropResult<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn embed_text(&self, texts: &[String]) -> CropResult<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains(self.favored) {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    #[derive(Debug)]
    struct ConstantScorer(f32);

    impl TextScorer for ConstantScorer {
        fn score_text(&self, _text: &str) -> CropResult<f32> {
            Ok(self.0)
        }
    }

    #[derive(Debug)]
    struct FailingScorer;

    impl TextScorer for FailingScorer {
        fn score_text(&self, _text: &str) -> CropResult<f32> {
            Err(CropError::scoring("scorer offline"))
        }
    }

    fn framed_image(ring: u32) -> RgbImage {
        RgbImage::from_fn(100, 100, |x, y| {
            let on_ring = x < ring || y < ring || x >= 100 - ring || y >= 100 - ring;
            if on_ring { Rgb([240, 240, 240]) } else { Rgb([15, 15, 15]) }
        })
    }

    fn centered_block(side: u32) -> RgbImage {
        let start = (100 - side) / 2;
        RgbImage::from_fn(100, 100, |x, y| {
            let inside = (start..start + side).contains(&x) && (start..start + side).contains(&y);
            if inside { Rgb([240, 240, 240]) } else { Rgb([15, 15, 15]) }
        })
    }

    fn scorer(favored: &'static str, text_scorer: Arc<dyn TextScorer>) -> CompositionScorer {
        CompositionScorer::new(
            Arc::new(KeywordEmbedder { favored }),
            text_scorer,
            ScoringConfig::default(),
        )
    }

    #[test]
    fn test_score_clamps_to_ten() {
        assert_eq!(finalize_score(9.8 + 1.2 + 1.5), 10.0);
        assert_eq!(finalize_score(-3.0), 0.0);
        assert!((finalize_score(6.74) - 6.7).abs() < 1e-6);
    }

    #[test]
    fn test_subject_bonus_bands() {
        assert_eq!(subject_bonus(0.5), 1.2);
        assert_eq!(subject_bonus(0.3), 0.5);
        assert_eq!(subject_bonus(0.7), 0.5);
        assert_eq!(subject_bonus(0.2), -0.8);
        assert_eq!(subject_bonus(0.85), -0.8);
    }

    #[test]
    fn test_aspect_bonus_peaks_on_common_ratios() {
        assert!((aspect_bonus(1.0) - 1.5).abs() < 1e-9);
        assert!((aspect_bonus(16.0 / 9.0) - 1.5).abs() < 1e-9);
        assert!(aspect_bonus(4.0) < 0.0);
    }

    #[test]
    fn test_zero_width_band_never_penalizes() {
        let mask = GrayImage::from_pixel(8, 8, Luma([255]));
        assert_eq!(edge_ratio(&mask, 0), 0.0);
        assert!(edge_ratio(&mask, 1) > 0.4);
    }

    #[test]
    fn test_edge_penalty_applies_above_threshold() {
        let scorer = scorer("good composition", Arc::new(ConstantScorer(5.0)));
        let features = |edge_ratio| GeometryFeatures {
            subject_ratio: 0.5,
            aspect_ratio: 1.0,
            edge_ratio,
        };
        assert!((scorer.geometric_adjustment(&features(0.5)) - 2.1).abs() < 1e-6);
        assert!((scorer.geometric_adjustment(&features(0.3)) - 2.7).abs() < 1e-6);
    }

    #[test]
    fn test_measure_subject_on_the_frame_edges() {
        let scorer = scorer("good composition", Arc::new(ConstantScorer(5.0)));
        let features = GeometryFeatures::measure(&framed_image(10), 0.1);
        // the 10 px ring covers 36% of the crop and sits entirely in the band
        assert!((features.subject_ratio - 0.36).abs() < 1e-6);
        assert!(features.edge_ratio > 0.99);
        assert!((scorer.geometric_adjustment(&features) - 2.1).abs() < 1e-6);
    }

    #[test]
    fn test_measure_centered_subject() {
        let scorer = scorer("good composition", Arc::new(ConstantScorer(5.0)));
        let features = GeometryFeatures::measure(&centered_block(60), 0.1);
        assert!((features.subject_ratio - 0.36).abs() < 1e-6);
        assert!(features.edge_ratio < 1e-6);
        assert_eq!(features.aspect_ratio, 1.0);
        assert_eq!(subject_bonus(features.subject_ratio), 1.2);
        assert!((scorer.geometric_adjustment(&features) - 2.7).abs() < 1e-6);
    }

    #[test]
    fn test_caption_collects_distinct_concepts() -> CropResult<()> {
        let scorer = scorer("color harmony", Arc::new(ConstantScorer(5.0)));
        let caption = scorer.caption(&[1.0, 0.0])?;
        let parts: Vec<&str> = caption.split(", ").collect();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], "color harmony");
        assert_eq!(parts[1], "good composition");
        Ok(())
    }

    #[test]
    fn test_styles_ranked_by_confidence() -> CropResult<()> {
        let scorer = scorer("high-contrast", Arc::new(ConstantScorer(5.0)));
        let styles = scorer.styles(&[1.0, 0.0])?;
        assert_eq!(styles.len(), 3);
        assert_eq!(styles[0].label, "high-contrast");
        assert!(styles[0].confidence > 0.99);
        assert_eq!(styles[1].label, "minimalist");
        Ok(())
    }

    #[test]
    fn test_assess_uniform_crop() {
        let scorer = scorer("good composition", Arc::new(ConstantScorer(6.0)));
        let crop = RgbImage::from_pixel(100, 100, Rgb([90, 120, 150]));
        let analysis = scorer.assess(&crop);
        let assessment = analysis.assessment().expect("assessed");
        // no salient pixels (-0.8), square aspect (+1.5), nothing on the edges
        assert!((assessment.score - 6.7).abs() < 1e-6);
        assert!(assessment.explanation.starts_with("Image analysis shows: good composition"));
        assert_eq!(assessment.style_labels.len(), 3);
        assert!(!assessment.suggestions.is_empty());
    }

    #[test]
    fn test_scorer_failure_is_reported_per_crop() {
        let scorer = scorer("good composition", Arc::new(FailingScorer));
        let analysis = scorer.assess(&RgbImage::new(20, 20));
        match analysis {
            CropAnalysis::Failed { error } => assert!(error.contains("scorer offline")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_text_score_fails_the_crop() {
        let scorer = scorer("good composition", Arc::new(ConstantScorer(f32::NAN)));
        let analysis = scorer.assess(&centered_block(60));
        match analysis {
            CropAnalysis::Failed { error } => assert!(error.contains("non-finite")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_embedding_dimension_mismatch_is_an_error() {
        let scorer = scorer("good composition", Arc::new(ConstantScorer(5.0)));
        assert!(scorer.caption(&[1.0, 0.0, 0.0]).is_err());
        assert!(scorer.styles(&[1.0]).is_err());
        assert!(scorer.caption(&[1.0, 0.0]).is_ok());
    }
}
