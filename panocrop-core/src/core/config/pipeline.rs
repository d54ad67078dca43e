//! Configuration for the crop pipeline stages and model backends.
//!
//! Every struct deserializes with `#[serde(default)]`, so a config file only needs to
//! name the values it changes.

use super::{ConfigError, ConfigValidator, OrtSessionConfig};
use crate::core::constants::*;
use crate::processors::SaliencyMethod;
use panocrop_derive::ConfigValidator;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Thresholds used when fusing saliency, detection and segmentation into regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ConfigValidator)]
#[serde(default)]
pub struct ProposalConfig {
    /// Saliency backend used when a request does not override it.
    pub saliency_method: SaliencyMethod,

    #[validate(min = 0.0)]
    pub saliency_min_area: f64,

    #[validate(min = 0)]
    pub object_min_area: i64,

    #[validate(min = 0.0)]
    pub segmentation_min_area: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub priority_confidence: f32,

    #[validate(range(min = 0.0, max = 1.0))]
    pub general_confidence: f32,

    /// Classes accepted at `priority_confidence`.
    pub priority_classes: Vec<String>,

    /// How many dominant segmentation classes to turn into regions.
    #[validate(min = 1)]
    pub segmentation_classes: usize,

    /// Class id ignored when ranking segmentation classes.
    pub background_class: u32,

    /// Grid cell size used for near-duplicate suppression.
    #[validate(min = 1)]
    pub dedup_cell: u32,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            saliency_method: SaliencyMethod::default(),
            saliency_min_area: DEFAULT_SALIENCY_MIN_AREA,
            object_min_area: DEFAULT_OBJECT_MIN_AREA,
            segmentation_min_area: DEFAULT_SEGMENTATION_MIN_AREA,
            priority_confidence: DEFAULT_PRIORITY_CONFIDENCE,
            general_confidence: DEFAULT_GENERAL_CONFIDENCE,
            priority_classes: DEFAULT_PRIORITY_CLASSES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            segmentation_classes: DEFAULT_SEGMENTATION_CLASSES,
            background_class: 0,
            dedup_cell: DEFAULT_DEDUP_CELL,
        }
    }
}

/// How many crops are produced per image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ConfigValidator)]
#[serde(default)]
pub struct SelectionConfig {
    #[validate(min = 1)]
    pub default_top_n: usize,

    /// Requests above this are clamped.
    #[validate(min = 1)]
    pub max_top_n: usize,

    #[validate(min = 3)]
    pub min_image_side: u32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            default_top_n: DEFAULT_TOP_N,
            max_top_n: MAX_TOP_N,
            min_image_side: MIN_IMAGE_SIDE,
        }
    }
}

/// Parameters of caption generation and the geometric score adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ConfigValidator)]
#[serde(default)]
pub struct ScoringConfig {
    /// Distinct concepts kept in a caption.
    #[validate(min = 1)]
    pub caption_concepts: usize,

    /// Style labels reported per crop.
    #[validate(min = 1)]
    pub style_count: usize,

    /// Multiplier applied to cosine similarities before the softmax.
    #[validate(min = 1.0)]
    pub logit_scale: f32,

    /// Width of the edge band as a fraction of the shorter crop side.
    #[validate(range(min = 0.0, max = 0.5))]
    pub edge_band_fraction: f32,

    /// Share of salient pixels in the edge band above which the penalty applies.
    #[validate(range(min = 0.0, max = 1.0))]
    pub edge_ratio_threshold: f32,

    #[validate(min = 0.0)]
    pub edge_penalty: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            caption_concepts: 5,
            style_count: 3,
            logit_scale: 100.0,
            edge_band_fraction: 0.1,
            edge_ratio_threshold: 0.3,
            edge_penalty: 0.6,
        }
    }
}

/// Locations of the model files backing each capability.
///
/// A missing detector or segmenter disables that signal source. A missing
/// embedding model or text scorer makes the pipeline refuse to process images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ConfigValidator)]
#[serde(default)]
pub struct ModelConfig {
    /// YOLO-style detector ONNX file.
    #[validate(optional_path)]
    pub detector_path: Option<PathBuf>,

    /// Class names for the detector, one per line. COCO names are used when absent.
    #[validate(optional_path)]
    pub detector_labels_path: Option<PathBuf>,

    /// DeepLab-style segmenter ONNX file.
    #[validate(optional_path)]
    pub segmenter_path: Option<PathBuf>,

    /// Learned saliency network ONNX file.
    #[validate(optional_path)]
    pub saliency_model_path: Option<PathBuf>,

    /// Directory holding `vision.onnx`, `text.onnx` and `tokenizer.json`.
    #[validate(optional_dir)]
    pub embedding_model_dir: Option<PathBuf>,

    /// Directory holding `model.onnx` and `tokenizer.json`.
    #[validate(optional_dir)]
    pub text_scorer_dir: Option<PathBuf>,

    /// Sessions opened per model for concurrent requests.
    #[validate(range(min = 1, max = 16))]
    pub session_pool_size: usize,

    pub ort_session: Option<OrtSessionConfig>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            detector_path: None,
            detector_labels_path: None,
            segmenter_path: None,
            saliency_model_path: None,
            embedding_model_dir: None,
            text_scorer_dir: None,
            session_pool_size: 1,
            ort_session: None,
        }
    }
}

/// Settings of the remote vision-language advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ConfigValidator)]
#[serde(default)]
pub struct AdvisoryConfig {
    #[validate(non_empty)]
    pub endpoint: String,

    /// Bearer token. The advisor is disabled when this is `None`.
    pub api_key: Option<String>,

    #[validate(non_empty)]
    pub model: String,

    #[validate(range(min = 1, max = 3600))]
    pub timeout_secs: u64,

    #[validate(min = 1)]
    pub max_tokens: u32,

    /// Extra attempts after a connection failure.
    #[validate(max = 5)]
    pub max_retries: u32,

    #[validate(range(min = 1, max = 100))]
    pub jpeg_quality: u8,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ADVISORY_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_ADVISORY_MODEL.to_string(),
            timeout_secs: 120,
            max_tokens: 2000,
            max_retries: 3,
            jpeg_quality: 85,
        }
    }
}

/// Complete configuration of a panorama crop pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub proposal: ProposalConfig,
    pub selection: SelectionConfig,
    pub scoring: ScoringConfig,
    pub models: ModelConfig,
    pub advisory: AdvisoryConfig,
}

impl ConfigValidator for PipelineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.proposal.validate()?;
        self.selection.validate()?;
        self.scoring.validate()?;
        self.models.validate()?;
        self.advisory.validate()?;

        if self.selection.default_top_n > self.selection.max_top_n {
            return Err(ConfigError::ValidationFailed {
                message: format!(
                    "default_top_n ({}) exceeds max_top_n ({})",
                    self.selection.default_top_n, self.selection.max_top_n
                ),
            });
        }
        if self.proposal.saliency_method == SaliencyMethod::Learned
            && self.models.saliency_model_path.is_none()
        {
            return Err(ConfigError::ValidationFailed {
                message: "learned saliency requires models.saliency_model_path".to_string(),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let cfg = ProposalConfig {
            general_confidence: 1.5,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("general_confidence"));
    }

    #[test]
    fn test_missing_detector_file_rejected() {
        let cfg = ModelConfig {
            detector_path: Some(PathBuf::from("/nonexistent/yolov5s.onnx")),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ModelPathNotFound { .. })
        ));
    }

    #[test]
    fn test_default_top_n_above_max_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.selection.default_top_n = 12;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_learned_saliency_needs_model() {
        let mut cfg = PipelineConfig::default();
        cfg.proposal.saliency_method = SaliencyMethod::Learned;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let cfg = AdvisoryConfig {
            endpoint: String::new(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
