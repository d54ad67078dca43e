//! Lazily loaded model handles shared by pipeline invocations.
//!
//! Each capability is loaded at most once per [`ModelContext`]. Loading happens on
//! first use, under the cell's initialization lock; afterwards reads are lock-free.
//! A failed load is not cached, so the next call tries again.

use crate::models::{
    BertTextScorer, ClipEmbedder, DeepLabSegmenter, OnnxSaliencyModel, YoloObjectDetector,
};
use once_cell::sync::OnceCell;
use panocrop_core::core::config::ModelConfig;
use panocrop_core::core::errors::{CropError, CropResult};
use panocrop_core::core::inference::OrtInfer;
use panocrop_core::core::traits::{
    ImageTextEmbedder, ObjectDetector, SaliencyModel, SemanticSegmenter, TextScorer,
};
use std::sync::Arc;
use tracing::info;

/// Optional capability: `None` when not configured.
type OptionalHandle<T> = OnceCell<Option<Arc<T>>>;

/// Model handles for one pipeline.
///
/// Handles can be injected up front (tests, custom backends) or loaded from the paths
/// in [`ModelConfig`] on first use.
#[derive(Debug, Default)]
pub struct ModelContext {
    config: ModelConfig,
    detector: OptionalHandle<dyn ObjectDetector>,
    segmenter: OptionalHandle<dyn SemanticSegmenter>,
    saliency_model: OptionalHandle<dyn SaliencyModel>,
    embedder: OnceCell<Arc<dyn ImageTextEmbedder>>,
    text_scorer: OnceCell<Arc<dyn TextScorer>>,
}

impl ModelContext {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn with_detector(self, detector: Arc<dyn ObjectDetector>) -> Self {
        let _ = self.detector.set(Some(detector));
        self
    }

    /// Turns object detection off regardless of the configuration.
    pub fn without_detector(self) -> Self {
        let _ = self.detector.set(None);
        self
    }

    pub fn with_segmenter(self, segmenter: Arc<dyn SemanticSegmenter>) -> Self {
        let _ = self.segmenter.set(Some(segmenter));
        self
    }

    /// Turns segmentation off regardless of the configuration.
    pub fn without_segmenter(self) -> Self {
        let _ = self.segmenter.set(None);
        self
    }

    pub fn with_saliency_model(self, model: Arc<dyn SaliencyModel>) -> Self {
        let _ = self.saliency_model.set(Some(model));
        self
    }

    pub fn with_embedder(self, embedder: Arc<dyn ImageTextEmbedder>) -> Self {
        let _ = self.embedder.set(embedder);
        self
    }

    pub fn with_text_scorer(self, text_scorer: Arc<dyn TextScorer>) -> Self {
        let _ = self.text_scorer.set(text_scorer);
        self
    }

    fn open(&self, path: &std::path::Path) -> CropResult<OrtInfer> {
        OrtInfer::from_config(
            path,
            self.config.session_pool_size,
            self.config.ort_session.as_ref(),
        )
    }

    /// The object detector, or `None` when no detector is configured.
    pub fn detector(&self) -> CropResult<Option<Arc<dyn ObjectDetector>>> {
        self.detector
            .get_or_try_init(|| {
                let Some(path) = &self.config.detector_path else {
                    return Ok(None);
                };
                let labels = match &self.config.detector_labels_path {
                    Some(labels) => YoloObjectDetector::load_labels(labels)?,
                    None => YoloObjectDetector::coco_labels(),
                };
                let detector = YoloObjectDetector::new(self.open(path)?, labels)?;
                info!(path = %path.display(), "loaded object detector");
                Ok(Some(Arc::new(detector) as Arc<dyn ObjectDetector>))
            })
            .cloned()
    }

    /// The semantic segmenter, or `None` when no segmenter is configured.
    pub fn segmenter(&self) -> CropResult<Option<Arc<dyn SemanticSegmenter>>> {
        self.segmenter
            .get_or_try_init(|| {
                let Some(path) = &self.config.segmenter_path else {
                    return Ok(None);
                };
                let segmenter = DeepLabSegmenter::new(self.open(path)?)?;
                info!(path = %path.display(), "loaded segmenter");
                Ok(Some(Arc::new(segmenter) as Arc<dyn SemanticSegmenter>))
            })
            .cloned()
    }

    /// The learned saliency network, or `None` when none is configured.
    pub fn saliency_model(&self) -> CropResult<Option<Arc<dyn SaliencyModel>>> {
        self.saliency_model
            .get_or_try_init(|| {
                let Some(path) = &self.config.saliency_model_path else {
                    return Ok(None);
                };
                let model = OnnxSaliencyModel::new(self.open(path)?)?;
                info!(path = %path.display(), "loaded saliency model");
                Ok(Some(Arc::new(model) as Arc<dyn SaliencyModel>))
            })
            .cloned()
    }

    /// The image-text embedder. Required for scoring.
    pub fn embedder(&self) -> CropResult<Arc<dyn ImageTextEmbedder>> {
        self.embedder
            .get_or_try_init(|| {
                let dir = self.config.embedding_model_dir.as_ref().ok_or_else(|| {
                    CropError::model_load_error(
                        "<unset>",
                        "no image-text embedding model configured",
                        Some("set models.embedding_model_dir"),
                        None::<std::io::Error>,
                    )
                })?;
                let embedder = ClipEmbedder::from_dir(
                    dir,
                    self.config.session_pool_size,
                    self.config.ort_session.as_ref(),
                )?;
                info!(dir = %dir.display(), "loaded image-text embedder");
                Ok(Arc::new(embedder) as Arc<dyn ImageTextEmbedder>)
            })
            .cloned()
    }

    /// The caption scorer. Required for scoring.
    pub fn text_scorer(&self) -> CropResult<Arc<dyn TextScorer>> {
        self.text_scorer
            .get_or_try_init(|| {
                let dir = self.config.text_scorer_dir.as_ref().ok_or_else(|| {
                    CropError::model_load_error(
                        "<unset>",
                        "no text scorer configured",
                        Some("set models.text_scorer_dir"),
                        None::<std::io::Error>,
                    )
                })?;
                let scorer = BertTextScorer::from_dir(
                    dir,
                    self.config.session_pool_size,
                    self.config.ort_session.as_ref(),
                )?;
                info!(dir = %dir.display(), "loaded text scorer");
                Ok(Arc::new(scorer) as Arc<dyn TextScorer>)
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use panocrop_core::domain::Detection;

    #[derive(Debug)]
    struct NoObjects;

    impl ObjectDetector for NoObjects {
        fn detect_objects(&self, _image: &RgbImage) -> CropResult<Vec<Detection>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_unconfigured_optional_models_are_none() -> CropResult<()> {
        let ctx = ModelContext::default();
        assert!(ctx.detector()?.is_none());
        assert!(ctx.segmenter()?.is_none());
        assert!(ctx.saliency_model()?.is_none());
        Ok(())
    }

    #[test]
    fn test_missing_required_models_fail() {
        let ctx = ModelContext::default();
        assert!(matches!(ctx.embedder(), Err(CropError::ModelLoad { .. })));
        assert!(matches!(ctx.text_scorer(), Err(CropError::ModelLoad { .. })));
    }

    #[test]
    fn test_injected_handle_wins_over_config() -> CropResult<()> {
        let config = ModelConfig {
            detector_path: Some("/nonexistent/yolo.onnx".into()),
            ..Default::default()
        };
        let ctx = ModelContext::new(config).with_detector(Arc::new(NoObjects));
        assert!(ctx.detector()?.is_some());
        Ok(())
    }

    #[test]
    fn test_failed_load_is_retried() {
        let config = ModelConfig {
            segmenter_path: Some("/nonexistent/deeplab.onnx".into()),
            ..Default::default()
        };
        let ctx = ModelContext::new(config);
        assert!(ctx.segmenter().is_err());
        assert!(ctx.segmenter().is_err());
    }
}
