//! Ranking, clamping and backfilling of candidate regions into crops.

use super::proposer::dedup_regions;
use panocrop_core::core::config::SelectionConfig;
use panocrop_core::core::constants::{DEFAULT_DEDUP_CELL, MIN_IMAGE_SIDE};
use panocrop_core::core::errors::{CropError, CropResult};
use panocrop_core::domain::{Crop, Region, RegionSource};
use panocrop_core::utils::crop_image;
use image::RgbImage;
use std::cmp::Reverse;
use tracing::debug;

/// Picks exactly `top_n` crops from a list of candidate regions.
#[derive(Debug, Clone)]
pub struct RegionSelector {
    config: SelectionConfig,
    dedup_cell: u32,
}

impl Default for RegionSelector {
    fn default() -> Self {
        Self::new(SelectionConfig::default(), DEFAULT_DEDUP_CELL)
    }
}

impl RegionSelector {
    /// Creates a selector. `min_image_side` is raised to [`MIN_IMAGE_SIDE`] if set
    /// lower, since smaller images leave the supplement layout empty.
    pub fn new(mut config: SelectionConfig, dedup_cell: u32) -> Self {
        config.min_image_side = config.min_image_side.max(MIN_IMAGE_SIDE);
        Self { config, dedup_cell }
    }

    /// Four quadrants and a centered half-size region, used when no signal produced
    /// a candidate.
    pub fn default_layout(width: u32, height: u32) -> Vec<Region> {
        let (w, h) = (width as i32, height as i32);
        let (hw, hh) = (w / 2, h / 2);
        vec![
            Region::new(0, 0, hw, hh, RegionSource::Default),
            Region::new(hw, 0, hw, hh, RegionSource::Default),
            Region::new(0, hh, hw, hh, RegionSource::Default),
            Region::new(hw, hh, hw, hh, RegionSource::Default),
            Region::new(w / 4, h / 4, hw, hh, RegionSource::DefaultCenter),
        ]
    }

    /// Fixed layout cycled through to top the selection up to `top_n`.
    pub fn supplement_layout(width: u32, height: u32) -> Vec<Region> {
        let (w, h) = (width as i32, height as i32);
        vec![
            Region::new(w / 6, h / 6, 2 * w / 3, 2 * h / 3, RegionSource::DefaultSupplement),
            Region::new(0, h / 3, w / 2, 2 * h / 3, RegionSource::DefaultSupplement),
            Region::new(w / 2, h / 3, w / 2, 2 * h / 3, RegionSource::DefaultSupplement),
        ]
    }

    /// Deduplicates `regions` and orders them by priority tier, then area, both
    /// descending. Equal keys keep their input order.
    pub fn rank(&self, regions: Vec<Region>) -> Vec<Region> {
        let mut ranked = dedup_regions(regions, self.dedup_cell);
        ranked.sort_by_key(|r| Reverse((r.source.priority_tier(), r.area())));
        ranked
    }

    /// Rejects requests that cannot produce `top_n` non-empty crops.
    pub fn check_request(&self, width: u32, height: u32, top_n: usize) -> CropResult<()> {
        if top_n == 0 {
            return Err(CropError::invalid_input("top_n must be at least 1"));
        }
        if width.min(height) < self.config.min_image_side {
            return Err(CropError::invalid_input(format!(
                "image {}x{} is too small to crop, shorter side must be at least {} px",
                width, height, self.config.min_image_side
            )));
        }
        Ok(())
    }

    /// Cuts exactly `top_n` crops out of `image`.
    ///
    /// The best `top_n` ranked regions are clamped to the image; those left empty by
    /// clamping are dropped and not replaced from further down the ranking. The
    /// supplement layout then fills any remaining slots.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when `top_n` is zero or the image's shorter side is below the
    /// configured minimum.
    pub fn select(&self, image: &RgbImage, regions: &[Region], top_n: usize) -> CropResult<Vec<Crop>> {
        let (width, height) = image.dimensions();
        self.check_request(width, height, top_n)?;

        let candidates = if regions.is_empty() {
            debug!("no candidate regions, using default layout");
            Self::default_layout(width, height)
        } else {
            regions.to_vec()
        };

        let mut crops: Vec<Crop> = self
            .rank(candidates)
            .into_iter()
            .take(top_n)
            .filter_map(|region| cut(image, &region))
            .collect();

        let supplements: Vec<Crop> = Self::supplement_layout(width, height)
            .iter()
            .filter_map(|region| cut(image, region))
            .collect();
        let missing = top_n.saturating_sub(crops.len());
        if missing > 0 {
            debug!(missing, "backfilling with supplement regions");
            crops.extend(supplements.iter().cycle().take(missing).cloned());
        }
        Ok(crops)
    }
}

fn cut(image: &RgbImage, region: &Region) -> Option<Crop> {
    let bbox = region.clamp_to(image.width(), image.height())?;
    Some(Crop {
        image: crop_image(image, &bbox),
        source: region.source.clone(),
        bbox,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use panocrop_core::domain::BoundingBox;

    #[test]
    fn test_object_ranks_before_larger_saliency() -> CropResult<()> {
        let image = RgbImage::new(400, 300);
        let regions = vec![
            Region::new(0, 0, 100, 50, RegionSource::Saliency),
            Region::new(200, 200, 40, 25, RegionSource::Object("person".into())),
        ];
        let crops = RegionSelector::default().select(&image, &regions, 2)?;
        assert_eq!(crops[0].source.to_string(), "object_person");
        assert_eq!(crops[1].source, RegionSource::Saliency);
        Ok(())
    }

    #[test]
    fn test_exact_count_inside_image() -> CropResult<()> {
        let image = RgbImage::new(640, 320);
        let regions = vec![
            Region::new(600, 300, 200, 200, RegionSource::Saliency),
            Region::new(-30, -30, 100, 100, RegionSource::Segmentation),
        ];
        for top_n in 1..=10 {
            let crops = RegionSelector::default().select(&image, &regions, top_n)?;
            assert_eq!(crops.len(), top_n);
            for crop in &crops {
                assert!(crop.bbox.width() > 0 && crop.bbox.height() > 0);
                assert!(crop.bbox.x2 <= 640 && crop.bbox.y2 <= 320);
                assert_eq!(crop.image.dimensions(), (crop.bbox.width(), crop.bbox.height()));
            }
        }
        Ok(())
    }

    #[test]
    fn test_empty_regions_use_default_layout() -> CropResult<()> {
        let image = RgbImage::new(400, 200);
        let crops = RegionSelector::default().select(&image, &[], 5)?;
        let tags: Vec<String> = crops.iter().map(|c| c.source.to_string()).collect();
        assert_eq!(tags.iter().filter(|t| *t == "default").count(), 4);
        assert!(tags.contains(&"default_center".to_string()));
        Ok(())
    }

    #[test]
    fn test_backfill_cycles_supplements() -> CropResult<()> {
        let image = RgbImage::new(600, 300);
        let regions = vec![Region::new(10, 10, 100, 100, RegionSource::Saliency)];
        let crops = RegionSelector::default().select(&image, &regions, 5)?;
        assert_eq!(crops[0].source, RegionSource::Saliency);
        let boxes: Vec<BoundingBox> = crops[1..].iter().map(|c| c.bbox).collect();
        assert_eq!(
            boxes,
            vec![
                BoundingBox::new(100, 50, 500, 250),
                BoundingBox::new(0, 100, 300, 300),
                BoundingBox::new(300, 100, 600, 300),
                BoundingBox::new(100, 50, 500, 250),
            ]
        );
        assert!(crops[1..].iter().all(|c| c.source == RegionSource::DefaultSupplement));
        Ok(())
    }

    #[test]
    fn test_rejects_invalid_requests() {
        let selector = RegionSelector::default();
        assert!(selector.select(&RgbImage::new(100, 100), &[], 0).is_err());
        assert!(selector.select(&RgbImage::new(100, 2), &[], 3).is_err());
    }

    #[test]
    fn test_minimum_side_cannot_be_lowered() -> CropResult<()> {
        let config = SelectionConfig {
            min_image_side: 1,
            ..SelectionConfig::default()
        };
        let selector = RegionSelector::new(config, DEFAULT_DEDUP_CELL);
        assert!(selector.select(&RgbImage::new(2, 2), &[], 3).is_err());
        assert!(selector.select(&RgbImage::new(1, 40), &[], 1).is_err());
        assert_eq!(selector.select(&RgbImage::new(3, 3), &[], 4)?.len(), 4);
        Ok(())
    }

    #[test]
    fn test_smallest_image_still_fills() -> CropResult<()> {
        let crops = RegionSelector::default().select(&RgbImage::new(3, 3), &[], 7)?;
        assert_eq!(crops.len(), 7);
        Ok(())
    }
}
