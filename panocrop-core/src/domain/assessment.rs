//! Composition assessment results and the flat records handed to storage.

use super::region::{BoundingBox, RegionSource};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A style adjective with its softmax confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleLabel {
    pub label: String,
    pub confidence: f32,
}

impl StyleLabel {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

impl fmt::Display for StyleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:.2})", self.label, self.confidence)
    }
}

/// Quality assessment of one crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionAssessment {
    /// In `[0, 10]`, rounded to one decimal.
    pub score: f32,
    /// Ordered by decreasing confidence.
    pub style_labels: Vec<StyleLabel>,
    /// Comma-separated composition concepts.
    pub caption: String,
    pub explanation: String,
    pub suggestions: Vec<String>,
}

impl CompositionAssessment {
    /// Style labels joined as `label(0.85), label(0.10)`.
    pub fn style_summary(&self) -> String {
        self.style_labels
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Outcome of analysing one crop. Failures are kept per crop so that one bad crop
/// does not abort the rest of the image.
#[derive(Debug, Clone, PartialEq)]
pub enum CropAnalysis {
    Assessed(CompositionAssessment),
    Failed { error: String },
}

impl CropAnalysis {
    pub fn assessment(&self) -> Option<&CompositionAssessment> {
        match self {
            CropAnalysis::Assessed(a) => Some(a),
            CropAnalysis::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CropAnalysis::Failed { .. })
    }
}

/// Flat, serializable view of one processed crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRecord {
    /// File name the crop image was (or will be) stored under.
    pub crop_filename: String,
    pub region_type: String,
    /// `x1,y1,x2,y2`
    pub coordinates: String,
    pub composition_score: Option<f32>,
    pub style_labels: String,
    pub explanation: String,
    /// One suggestion per line.
    pub suggestions: String,
    pub advisory_text: String,
    pub error: Option<String>,
}

impl CropRecord {
    pub fn new(
        crop_filename: impl Into<String>,
        source: &RegionSource,
        bbox: &BoundingBox,
        analysis: &CropAnalysis,
        advisory_text: impl Into<String>,
    ) -> Self {
        let (score, styles, explanation, suggestions, error) = match analysis {
            CropAnalysis::Assessed(a) => (
                Some(a.score),
                a.style_summary(),
                a.explanation.clone(),
                a.suggestions.join("\n"),
                None,
            ),
            CropAnalysis::Failed { error } => (
                None,
                String::new(),
                String::new(),
                String::new(),
                Some(error.clone()),
            ),
        };
        Self {
            crop_filename: crop_filename.into(),
            region_type: source.to_string(),
            coordinates: bbox.to_string(),
            composition_score: score,
            style_labels: styles,
            explanation,
            suggestions,
            advisory_text: advisory_text.into(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment() -> CompositionAssessment {
        CompositionAssessment {
            score: 7.4,
            style_labels: vec![
                StyleLabel::new("minimalist", 0.853),
                StyleLabel::new("soft", 0.1),
            ],
            caption: "good composition".to_string(),
            explanation: "Image analysis shows: good composition".to_string(),
            suggestions: vec!["first".to_string(), "second".to_string()],
        }
    }

    #[test]
    fn test_style_summary_format() {
        assert_eq!(assessment().style_summary(), "minimalist(0.85), soft(0.10)");
    }

    #[test]
    fn test_record_from_assessed_crop() {
        let record = CropRecord::new(
            "crop_1.jpg",
            &RegionSource::Object("person".into()),
            &BoundingBox::new(0, 0, 100, 50),
            &CropAnalysis::Assessed(assessment()),
            "advice",
        );
        assert_eq!(record.region_type, "object_person");
        assert_eq!(record.coordinates, "0,0,100,50");
        assert_eq!(record.composition_score, Some(7.4));
        assert_eq!(record.suggestions, "first\nsecond");
        assert!(record.error.is_none());
    }

    #[test]
    fn test_record_from_failed_crop() {
        let record = CropRecord::new(
            "crop_2.jpg",
            &RegionSource::Saliency,
            &BoundingBox::new(1, 1, 5, 5),
            &CropAnalysis::Failed {
                error: "text scorer failed".to_string(),
            },
            "",
        );
        assert_eq!(record.composition_score, None);
        assert_eq!(record.error.as_deref(), Some("text scorer failed"));
    }
}
