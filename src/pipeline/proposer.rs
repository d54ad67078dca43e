//! Candidate region proposal.
//!
//! Three signal sources contribute regions: the saliency map, the object detector and
//! the semantic segmenter. Only saliency is mandatory; a detector or segmenter that is
//! not configured, or that fails, simply contributes nothing.

use panocrop_core::core::config::ProposalConfig;
use panocrop_core::core::errors::CropResult;
use panocrop_core::core::traits::{ObjectDetector, SemanticSegmenter};
use panocrop_core::domain::{Detection, Region, RegionSource, SegmentationMap};
use panocrop_core::processors::{SaliencyDetector, external_contours, otsu_binarize};
use image::{GrayImage, RgbImage};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Signal sources consulted by [`RegionProposer::propose`].
#[derive(Clone, Copy)]
pub struct SignalSources<'a> {
    pub saliency: &'a SaliencyDetector,
    pub detector: Option<&'a dyn ObjectDetector>,
    pub segmenter: Option<&'a dyn SemanticSegmenter>,
}

impl<'a> SignalSources<'a> {
    /// Saliency only, with detection and segmentation disabled.
    pub fn saliency_only(saliency: &'a SaliencyDetector) -> Self {
        Self {
            saliency,
            detector: None,
            segmenter: None,
        }
    }
}

/// Output of [`RegionProposer::propose`].
#[derive(Debug, Clone)]
pub struct Proposal {
    /// Fused and deduplicated candidates, saliency first, then objects, then
    /// segmentation.
    pub regions: Vec<Region>,
    pub saliency_map: GrayImage,
    /// `None` when segmentation was disabled or failed.
    pub segmentation: Option<SegmentationMap>,
}

/// Turns saliency, detection and segmentation signals into candidate regions.
#[derive(Debug, Clone, Default)]
pub struct RegionProposer {
    config: ProposalConfig,
}

impl RegionProposer {
    pub fn new(config: ProposalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProposalConfig {
        &self.config
    }

    /// Bounding rectangles of the salient blobs.
    ///
    /// The map is binarized with Otsu's level and only outermost contours whose
    /// enclosed area exceeds `saliency_min_area` are kept.
    pub fn saliency_regions(&self, saliency_map: &GrayImage) -> Vec<Region> {
        let (level, mask) = otsu_binarize(saliency_map);
        let regions: Vec<Region> = external_contours(&mask)
            .into_iter()
            .filter(|c| c.area > self.config.saliency_min_area)
            .map(|c| Region::new(c.x, c.y, c.width, c.height, RegionSource::Saliency))
            .collect();
        debug!(otsu_level = level, count = regions.len(), "saliency regions");
        regions
    }

    /// Detections that pass the confidence and size filters.
    ///
    /// Classes on the priority list are accepted at the lower `priority_confidence`;
    /// every other class needs `general_confidence`.
    pub fn object_regions(&self, detections: &[Detection]) -> Vec<Region> {
        detections
            .iter()
            .filter(|d| {
                let prioritized = self.config.priority_classes.contains(&d.class_name);
                (prioritized && d.confidence > self.config.priority_confidence)
                    || d.confidence > self.config.general_confidence
            })
            .filter_map(|d| {
                let (x1, y1, x2, y2) = d.pixel_box();
                let (w, h) = (x2 - x1, y2 - y1);
                let large_enough = w > 0
                    && h > 0
                    && (w as i64) * (h as i64) > self.config.object_min_area;
                large_enough
                    .then(|| Region::new(x1, y1, w, h, RegionSource::Object(d.class_name.clone())))
            })
            .collect()
    }

    /// Regions covering the dominant segmentation classes.
    ///
    /// Classes are ranked by pixel count (ties go to the smaller id), the background
    /// class is skipped, and each of the top `segmentation_classes` contributes the
    /// outer contours of its mask that enclose more than `segmentation_min_area`.
    pub fn segmentation_regions(&self, segmentation: &SegmentationMap) -> Vec<Region> {
        let mut counts: Vec<(u32, usize)> = segmentation
            .class_counts()
            .into_iter()
            .filter(|&(id, _)| id != self.config.background_class)
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        counts
            .iter()
            .take(self.config.segmentation_classes)
            .flat_map(|&(class_id, pixels)| {
                let contours = external_contours(&segmentation.class_mask(class_id));
                debug!(class_id, pixels, contours = contours.len(), "segmentation class");
                contours
            })
            .filter(|c| c.area > self.config.segmentation_min_area)
            .map(|c| Region::new(c.x, c.y, c.width, c.height, RegionSource::Segmentation))
            .collect()
    }

    /// Concatenates the per-source regions and removes near-duplicates.
    pub fn fuse(
        &self,
        saliency: Vec<Region>,
        objects: Vec<Region>,
        segmentation: Vec<Region>,
    ) -> Vec<Region> {
        let mut all = saliency;
        all.extend(objects);
        all.extend(segmentation);
        dedup_regions(all, self.config.dedup_cell)
    }

    /// Runs every configured signal source over `image` and fuses the results.
    ///
    /// Saliency, detection and segmentation run concurrently. A saliency failure is
    /// returned as an error; detection and segmentation failures are logged and the
    /// source is left out.
    pub fn propose(&self, image: &RgbImage, sources: SignalSources<'_>) -> CropResult<Proposal> {
        let (saliency_map, (detections, segmentation)) = rayon::join(
            || sources.saliency.detect(image),
            || {
                rayon::join(
                    || run_detector(sources.detector, image),
                    || run_segmenter(sources.segmenter, image),
                )
            },
        );
        let saliency_map = saliency_map?;

        let saliency = self.saliency_regions(&saliency_map);
        let objects = self.object_regions(&detections);
        let segments = segmentation
            .as_ref()
            .map(|s| self.segmentation_regions(s))
            .unwrap_or_default();

        debug!(
            saliency = saliency.len(),
            objects = objects.len(),
            segmentation = segments.len(),
            "proposed regions"
        );

        Ok(Proposal {
            regions: self.fuse(saliency, objects, segments),
            saliency_map,
            segmentation,
        })
    }
}

fn run_detector(detector: Option<&dyn ObjectDetector>, image: &RgbImage) -> Vec<Detection> {
    let Some(detector) = detector else {
        debug!("object detection disabled");
        return Vec::new();
    };
    detector.detect_objects(image).unwrap_or_else(|e| {
        warn!(error = %e, "object detection failed, skipping detector regions");
        Vec::new()
    })
}

fn run_segmenter(
    segmenter: Option<&dyn SemanticSegmenter>,
    image: &RgbImage,
) -> Option<SegmentationMap> {
    let Some(segmenter) = segmenter else {
        debug!("semantic segmentation disabled");
        return None;
    };
    match segmenter.segment(image) {
        Ok(map) => Some(map),
        Err(e) => {
            warn!(error = %e, "segmentation failed, skipping segmentation regions");
            None
        }
    }
}

/// Keeps the first region of every grid bucket, preserving order.
///
/// See [`Region::dedup_key`] for the bucketing. Applying it twice changes nothing.
pub fn dedup_regions(regions: Vec<Region>, cell: u32) -> Vec<Region> {
    let mut seen = HashSet::new();
    regions
        .into_iter()
        .filter(|r| seen.insert(r.dedup_key(cell)))
        .collect()
}
