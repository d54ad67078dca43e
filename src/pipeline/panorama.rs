//! End-to-end panorama processing: propose, select, assess and advise.

use super::proposer::{RegionProposer, SignalSources};
use super::scorer::CompositionScorer;
use super::selector::RegionSelector;
use crate::advisory::{ADVISORY_DISABLED, AdviceRequest, ChatAdvisorClient, RemoteAdvisor};
use crate::context::ModelContext;
use once_cell::sync::OnceCell;
use panocrop_core::core::config::{ConfigValidator, PipelineConfig};
use panocrop_core::core::errors::{CropError, CropResult, ProcessingStage};
use panocrop_core::domain::{Crop, CropAnalysis, CropRecord};
use panocrop_core::processors::{SaliencyDetector, SaliencyMethod};
use panocrop_core::utils::load_image;
use image::RgbImage;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CropRequest {
    /// Number of crops. Falls back to the configured default.
    pub top_n: Option<usize>,
    /// Overrides the configured saliency method.
    pub saliency_method: Option<SaliencyMethod>,
    /// Scene description forwarded to the remote advisor.
    pub context_text: String,
}

impl CropRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }

    pub fn saliency_method(mut self, method: SaliencyMethod) -> Self {
        self.saliency_method = Some(method);
        self
    }

    pub fn context_text(mut self, text: impl Into<String>) -> Self {
        self.context_text = text.into();
        self
    }
}

/// One selected crop with its analysis and advice.
#[derive(Debug, Clone)]
pub struct ProcessedCrop {
    pub crop: Crop,
    pub analysis: CropAnalysis,
    pub advisory_text: String,
}

/// Everything produced for one source image.
#[derive(Debug, Clone)]
pub struct PanoramaResult {
    pub crops: Vec<ProcessedCrop>,
    pub saliency_method: SaliencyMethod,
    /// Number of candidate regions before selection.
    pub candidate_count: usize,
}

impl PanoramaResult {
    /// Flat records, naming each crop with `name_fn(index, crop)`.
    pub fn records(&self, name_fn: impl Fn(usize, &ProcessedCrop) -> String) -> Vec<CropRecord> {
        self.crops
            .iter()
            .enumerate()
            .map(|(i, pc)| {
                CropRecord::new(
                    name_fn(i, pc),
                    &pc.crop.source,
                    &pc.crop.bbox,
                    &pc.analysis,
                    pc.advisory_text.clone(),
                )
            })
            .collect()
    }
}

/// Serializes records as a pretty-printed JSON array.
pub fn records_to_json(records: &[CropRecord]) -> CropResult<String> {
    serde_json::to_string_pretty(records).map_err(|e| {
        CropError::processing_error(ProcessingStage::Generic, "failed to serialize crop records", e)
    })
}

/// Crop proposal and scoring pipeline for panoramic images.
///
/// Safe to share across threads; model handles are loaded once and reused.
pub struct PanoramaPipeline {
    config: PipelineConfig,
    models: Arc<ModelContext>,
    proposer: RegionProposer,
    selector: RegionSelector,
    advisor: Option<Arc<dyn RemoteAdvisor>>,
    scorer: OnceCell<CompositionScorer>,
}

impl std::fmt::Debug for PanoramaPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanoramaPipeline")
            .field("config", &self.config)
            .field("advisor", &self.advisor)
            .finish()
    }
}

/// Builder for [`PanoramaPipeline`].
#[derive(Debug, Default)]
pub struct PanoramaPipelineBuilder {
    config: PipelineConfig,
    models: Option<ModelContext>,
    advisor: Option<Option<Arc<dyn RemoteAdvisor>>>,
}

impl PanoramaPipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            models: None,
            advisor: None,
        }
    }

    /// Uses `models` instead of a context built from the configured paths.
    pub fn models(mut self, models: ModelContext) -> Self {
        self.models = Some(models);
        self
    }

    /// Uses `advisor` instead of the configured chat client.
    pub fn advisor(mut self, advisor: Arc<dyn RemoteAdvisor>) -> Self {
        self.advisor = Some(Some(advisor));
        self
    }

    /// Disables remote advice regardless of the configuration.
    pub fn without_advisor(mut self) -> Self {
        self.advisor = Some(None);
        self
    }

    /// Validates the configuration and assembles the pipeline. Models are not loaded
    /// until the first image is processed.
    pub fn build(self) -> CropResult<PanoramaPipeline> {
        self.config.validate()?;
        let advisor = match self.advisor {
            Some(advisor) => advisor,
            None => ChatAdvisorClient::from_config(&self.config.advisory)?
                .map(|c| Arc::new(c) as Arc<dyn RemoteAdvisor>),
        };
        let models = self
            .models
            .unwrap_or_else(|| ModelContext::new(self.config.models.clone()));
        Ok(PanoramaPipeline {
            proposer: RegionProposer::new(self.config.proposal.clone()),
            selector: RegionSelector::new(self.config.selection.clone(), self.config.proposal.dedup_cell),
            config: self.config,
            models: Arc::new(models),
            advisor,
            scorer: OnceCell::new(),
        })
    }
}

impl PanoramaPipeline {
    pub fn builder(config: PipelineConfig) -> PanoramaPipelineBuilder {
        PanoramaPipelineBuilder::new(config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn models(&self) -> &ModelContext {
        &self.models
    }

    /// Resolves the requested crop count against the configured default and cap.
    pub fn resolve_top_n(&self, requested: Option<usize>) -> CropResult<usize> {
        let selection = &self.config.selection;
        match requested.unwrap_or(selection.default_top_n) {
            0 => Err(CropError::invalid_input("top_n must be at least 1")),
            n if n > selection.max_top_n => {
                warn!(requested = n, max = selection.max_top_n, "top_n clamped");
                Ok(selection.max_top_n)
            }
            n => Ok(n),
        }
    }

    /// The composition scorer, loading the embedder and text scorer on first use.
    pub fn scorer(&self) -> CropResult<&CompositionScorer> {
        self.scorer.get_or_try_init(|| {
            Ok(CompositionScorer::new(
                self.models.embedder()?,
                self.models.text_scorer()?,
                self.config.scoring.clone(),
            ))
        })
    }

    fn saliency_detector(&self, method: SaliencyMethod) -> CropResult<SaliencyDetector> {
        match method {
            SaliencyMethod::FrequencyTuned => Ok(SaliencyDetector::frequency_tuned()),
            SaliencyMethod::Learned => match self.models.saliency_model()? {
                Some(model) => Ok(SaliencyDetector::learned(model)),
                None => Err(CropError::config_error(
                    "learned saliency selected but no saliency model is configured",
                )),
            },
        }
    }

    /// Crops, scores and annotates `image`.
    ///
    /// # Errors
    ///
    /// Fails before any processing when the request is invalid, the image is too small
    /// or a scoring model cannot be loaded, and when saliency computation fails.
    /// Detector, segmenter, per-crop scoring and advisory failures are absorbed.
    pub fn process(&self, image: &RgbImage, request: &CropRequest) -> CropResult<PanoramaResult> {
        let top_n = self.resolve_top_n(request.top_n)?;
        self.selector
            .check_request(image.width(), image.height(), top_n)?;
        let scorer = self.scorer()?;
        let method = request
            .saliency_method
            .unwrap_or(self.config.proposal.saliency_method);
        let saliency = self.saliency_detector(method)?;

        let detector = self.models.detector().unwrap_or_else(|e| {
            warn!(error = %e, "object detector unavailable");
            None
        });
        let segmenter = self.models.segmenter().unwrap_or_else(|e| {
            warn!(error = %e, "segmenter unavailable");
            None
        });
        let sources = SignalSources {
            saliency: &saliency,
            detector: detector.as_deref(),
            segmenter: segmenter.as_deref(),
        };

        let proposal = self.proposer.propose(image, sources)?;
        let candidate_count = proposal.regions.len();
        let crops = self.selector.select(image, &proposal.regions, top_n)?;

        let processed: Vec<ProcessedCrop> = crops
            .into_iter()
            .map(|crop| {
                let analysis = scorer.assess(&crop.image);
                let advisory_text = self.advise(image, &crop, &request.context_text);
                debug!(region = %crop.source, bbox = %crop.bbox, failed = analysis.is_failed(), "processed crop");
                ProcessedCrop {
                    crop,
                    analysis,
                    advisory_text,
                }
            })
            .collect();

        info!(
            width = image.width(),
            height = image.height(),
            %method,
            candidates = candidate_count,
            crops = processed.len(),
            "processed panorama"
        );
        Ok(PanoramaResult {
            crops: processed,
            saliency_method: method,
            candidate_count,
        })
    }

    fn advise(&self, original: &RgbImage, crop: &Crop, context_text: &str) -> String {
        let Some(advisor) = &self.advisor else {
            return ADVISORY_DISABLED.to_string();
        };
        let region_type = crop.source.to_string();
        let coordinates = crop.bbox.to_string();
        advisor.advise(&AdviceRequest {
            original,
            crop: &crop.image,
            region_type: &region_type,
            coordinates: &coordinates,
            context_text,
        })
    }

    /// Loads the image at `path` and processes it.
    pub fn process_path(&self, path: &Path, request: &CropRequest) -> CropResult<PanoramaResult> {
        let image = load_image(path)?;
        self.process(&image, request)
    }

    /// Processes `image` with `method` regardless of the request's own setting.
    pub fn process_with_method(
        &self,
        image: &RgbImage,
        method: SaliencyMethod,
        request: &CropRequest,
    ) -> CropResult<PanoramaResult> {
        let request = request.clone().saliency_method(method);
        self.process(image, &request)
    }

    /// Fills a shared quota of crops from several candidate images.
    ///
    /// Images are processed in order, each asked only for the slots still open, until
    /// the quota from the request is met. Images left over once it is met are not
    /// touched.
    pub fn process_many<'a>(
        &self,
        images: impl IntoIterator<Item = &'a RgbImage>,
        request: &CropRequest,
    ) -> CropResult<Vec<PanoramaResult>> {
        let quota = self.resolve_top_n(request.top_n)?;
        let mut results = Vec::new();
        let mut saved = 0;
        for image in images {
            let remaining = quota.saturating_sub(saved);
            if remaining == 0 {
                break;
            }
            let result = self.process(image, &request.clone().top_n(remaining))?;
            saved += result.crops.len();
            results.push(result);
        }
        if saved == 0 {
            return Err(CropError::invalid_input("no crops could be produced from the given images"));
        }
        Ok(results)
    }

    /// Like [`PanoramaPipeline::process_many`] for image files. Unreadable files are
    /// skipped with a warning.
    pub fn process_many_paths<P: AsRef<Path>>(
        &self,
        paths: impl IntoIterator<Item = P>,
        request: &CropRequest,
    ) -> CropResult<Vec<(P, PanoramaResult)>> {
        let quota = self.resolve_top_n(request.top_n)?;
        let mut results = Vec::new();
        let mut saved = 0;
        for path in paths {
            let remaining = quota.saturating_sub(saved);
            if remaining == 0 {
                break;
            }
            let image = match load_image(path.as_ref()) {
                Ok(image) => image,
                Err(e) => {
                    warn!(path = %path.as_ref().display(), error = %e, "skipping unreadable image");
                    continue;
                }
            };
            let result = self.process(&image, &request.clone().top_n(remaining))?;
            saved += result.crops.len();
            results.push((path, result));
        }
        if saved == 0 {
            return Err(CropError::invalid_input("no crops could be produced from the given images"));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb};
    use panocrop_core::core::traits::{ImageTextEmbedder, SaliencyModel, TextScorer};
    use panocrop_core::domain::{BoundingBox, RegionSource};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct FlatEmbedder;

    impl ImageTextEmbedder for FlatEmbedder {
        fn embed_image(&self, _image: &RgbImage) -> CropResult<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn embed_text(&self, texts: &[String]) -> CropResult<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("subject not prominent") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    #[derive(Debug)]
    struct FixedScorer;

    impl TextScorer for FixedScorer {
        fn score_text(&self, _text: &str) -> CropResult<f32> {
            Ok(7.0)
        }
    }

    /// Marks a fixed 100 x 100 block at (20, 40) as salient.
    #[derive(Debug)]
    struct BlockSaliency;

    impl SaliencyModel for BlockSaliency {
        fn predict(&self, image: &RgbImage) -> CropResult<GrayImage> {
            Ok(GrayImage::from_fn(image.width(), image.height(), |x, y| {
                if (20..120).contains(&x) && (40..140).contains(&y) {
                    Luma([230])
                } else {
                    Luma([0])
                }
            }))
        }
    }

    #[derive(Debug, Default)]
    struct RecordingAdvisor {
        regions: Mutex<Vec<String>>,
    }

    impl RemoteAdvisor for RecordingAdvisor {
        fn advise(&self, request: &AdviceRequest<'_>) -> String {
            if let Ok(mut regions) = self.regions.lock() {
                regions.push(request.region_type.to_string());
            }
            format!("advice for {} at {}", request.region_type, request.coordinates)
        }
    }

    fn fake_models() -> ModelContext {
        ModelContext::default()
            .with_embedder(Arc::new(FlatEmbedder))
            .with_text_scorer(Arc::new(FixedScorer))
    }

    fn pipeline() -> CropResult<PanoramaPipeline> {
        PanoramaPipeline::builder(PipelineConfig::default())
            .models(fake_models())
            .without_advisor()
            .build()
    }

    fn bright_square(size: u32, x0: u32, side: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            let inside = (x0..x0 + side).contains(&x) && (x0..x0 + side).contains(&y);
            if inside { Rgb([245, 240, 235]) } else { Rgb([20, 25, 30]) }
        })
    }

    #[test]
    fn test_bright_square_scenario() -> CropResult<()> {
        let image = bright_square(512, 156, 200);
        let pipeline = PanoramaPipeline::builder(PipelineConfig::default())
            .models(fake_models().without_detector().without_segmenter())
            .without_advisor()
            .build()?;
        let result = pipeline.process(&image, &CropRequest::new().top_n(3))?;
        assert!(result.crops.iter().all(|pc| !matches!(pc.crop.source, RegionSource::Object(_))));
        assert_eq!(result.crops.len(), 3);
        assert_eq!(result.crops[0].crop.source, RegionSource::Saliency);
        assert_eq!(result.crops[0].crop.bbox, BoundingBox::new(156, 156, 356, 356));
        assert_eq!(result.crops[1].crop.source, RegionSource::DefaultSupplement);
        assert_eq!(result.crops[1].crop.bbox, BoundingBox::new(85, 85, 426, 426));
        assert_eq!(result.crops[2].crop.bbox, BoundingBox::new(0, 170, 256, 511));
        for pc in &result.crops {
            let assessment = pc.analysis.assessment().expect("assessed");
            assert!((0.0..=10.0).contains(&assessment.score));
            assert!(assessment.caption.starts_with("subject not prominent"));
            assert_eq!(pc.advisory_text, ADVISORY_DISABLED);
        }
        Ok(())
    }

    #[test]
    fn test_uniform_image_uses_default_layout() -> CropResult<()> {
        let image = RgbImage::from_pixel(400, 200, Rgb([128, 128, 128]));
        let result = pipeline()?.process(&image, &CropRequest::new())?;
        assert_eq!(result.candidate_count, 0);
        assert_eq!(result.crops.len(), 5);
        assert!(
            result
                .crops
                .iter()
                .any(|pc| pc.crop.source == RegionSource::DefaultCenter)
        );
        Ok(())
    }

    #[test]
    fn test_missing_scoring_models_fail_early() -> CropResult<()> {
        let pipeline = PanoramaPipeline::builder(PipelineConfig::default())
            .without_advisor()
            .build()?;
        let err = pipeline
            .process(&RgbImage::new(64, 64), &CropRequest::new())
            .unwrap_err();
        assert!(matches!(err, CropError::ModelLoad { .. }));
        Ok(())
    }

    #[test]
    fn test_top_n_validation() -> CropResult<()> {
        let pipeline = pipeline()?;
        assert!(pipeline.resolve_top_n(Some(0)).is_err());
        assert_eq!(pipeline.resolve_top_n(Some(25))?, 10);
        assert_eq!(pipeline.resolve_top_n(None)?, 5);
        let err = pipeline
            .process(&RgbImage::new(2, 50), &CropRequest::new())
            .unwrap_err();
        assert!(matches!(err, CropError::InvalidInput { .. }));
        Ok(())
    }

    #[test]
    fn test_learned_method_without_model_is_config_error() -> CropResult<()> {
        let err = pipeline()?
            .process_with_method(&RgbImage::new(64, 64), SaliencyMethod::Learned, &CropRequest::new())
            .unwrap_err();
        assert!(matches!(err, CropError::ConfigError { .. }));
        Ok(())
    }

    #[test]
    fn test_injected_saliency_model_drives_learned_method() -> CropResult<()> {
        let pipeline = PanoramaPipeline::builder(PipelineConfig::default())
            .models(fake_models().with_saliency_model(Arc::new(BlockSaliency)))
            .without_advisor()
            .build()?;
        let result = pipeline.process_with_method(
            &RgbImage::new(256, 256),
            SaliencyMethod::Learned,
            &CropRequest::new().top_n(1),
        )?;
        assert_eq!(result.saliency_method, SaliencyMethod::Learned);
        assert_eq!(result.crops[0].crop.source, RegionSource::Saliency);
        assert_eq!(result.crops[0].crop.bbox, BoundingBox::new(20, 40, 120, 140));
        Ok(())
    }

    #[test]
    fn test_advisor_sees_every_crop() -> CropResult<()> {
        let advisor = Arc::new(RecordingAdvisor::default());
        let pipeline = PanoramaPipeline::builder(PipelineConfig::default())
            .models(fake_models())
            .advisor(advisor.clone())
            .build()?;
        let result = pipeline.process(
            &bright_square(256, 64, 100),
            &CropRequest::new().top_n(2).context_text("facing north"),
        )?;
        assert_eq!(advisor.regions.lock().map(|r| r.len()).unwrap_or(0), 2);
        assert!(result.crops[0].advisory_text.starts_with("advice for saliency"));
        Ok(())
    }

    #[test]
    fn test_process_many_stops_at_quota() -> CropResult<()> {
        let images = vec![bright_square(256, 64, 100), RgbImage::new(1, 1)];
        let results = pipeline()?.process_many(&images, &CropRequest::new().top_n(4))?;
        // the undersized second image is never reached
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].crops.len(), 4);
        Ok(())
    }

    #[test]
    fn test_process_many_paths_skips_unreadable() -> CropResult<()> {
        let path = std::env::temp_dir().join(format!("panocrop_many_{}.png", std::process::id()));
        bright_square(128, 32, 64).save(&path)?;
        let paths = vec![Path::new("/nonexistent/a.jpg").to_path_buf(), path.clone()];
        let results = pipeline()?.process_many_paths(paths, &CropRequest::new().top_n(2))?;
        std::fs::remove_file(&path)?;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, path);
        Ok(())
    }

    #[test]
    fn test_records_serialize() -> CropResult<()> {
        let result = pipeline()?.process(&bright_square(256, 64, 100), &CropRequest::new().top_n(2))?;
        let records = result.records(|i, pc| format!("pano_{}_{}.jpg", i + 1, pc.crop.source));
        assert_eq!(records[0].crop_filename, "pano_1_saliency.jpg");
        assert_eq!(records[0].coordinates, result.crops[0].crop.bbox.to_string());
        let json = records_to_json(&records)?;
        assert!(json.contains("\"region_type\": \"saliency\""));
        Ok(())
    }
}
