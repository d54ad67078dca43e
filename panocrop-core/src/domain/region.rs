//! Candidate regions and the crops cut from them.

use image::RgbImage;
use serde::{Serialize, Serializer};
use std::fmt;

/// Provenance of a candidate region.
///
/// The display form is the region-type tag reported to callers
/// (`saliency`, `object_person`, `default_supplement`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegionSource {
    /// Bounding rectangle of a salient contour.
    Saliency,
    /// Object detector box, carrying the class name.
    Object(String),
    /// Bounding rectangle of a dominant segmentation class contour.
    Segmentation,
    /// Image quadrant used when no signal produced a region.
    Default,
    /// Centered half-size region used when no signal produced a region.
    DefaultCenter,
    /// Fixed layout used to top up the selection.
    DefaultSupplement,
}

impl RegionSource {
    /// Selection priority: objects first, then segmentation, then everything else.
    pub fn priority_tier(&self) -> u8 {
        match self {
            RegionSource::Object(_) => 10,
            RegionSource::Segmentation => 5,
            _ => 1,
        }
    }
}

impl fmt::Display for RegionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionSource::Saliency => f.write_str("saliency"),
            RegionSource::Object(class) => write!(f, "object_{}", class),
            RegionSource::Segmentation => f.write_str("segmentation"),
            RegionSource::Default => f.write_str("default"),
            RegionSource::DefaultCenter => f.write_str("default_center"),
            RegionSource::DefaultSupplement => f.write_str("default_supplement"),
        }
    }
}

impl Serialize for RegionSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Axis-aligned candidate rectangle in source-image pixels.
///
/// Coordinates are signed because detector boxes may overhang the image; they are
/// only guaranteed to be in bounds after [`Region::clamp_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub source: RegionSource,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32, source: RegionSource) -> Self {
        Self {
            x,
            y,
            width,
            height,
            source,
        }
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Grid bucket used to collapse near-identical regions.
    ///
    /// Each coordinate is divided by `cell` and rounded half to even, so regions
    /// that differ by less than half a cell in every coordinate share a key.
    pub fn dedup_key(&self, cell: u32) -> (i64, i64, i64, i64) {
        let cell = cell.max(1) as f64;
        let bucket = |v: i32| (v as f64 / cell).round_ties_even() as i64;
        (
            bucket(self.x),
            bucket(self.y),
            bucket(self.width),
            bucket(self.height),
        )
    }

    /// Restricts the region to an image of `image_width` x `image_height`.
    ///
    /// Negative origins are moved to zero before the far edge is computed, and the far
    /// edge is capped at the image border. Returns `None` when nothing is left.
    pub fn clamp_to(&self, image_width: u32, image_height: u32) -> Option<BoundingBox> {
        let x1 = self.x.max(0) as i64;
        let y1 = self.y.max(0) as i64;
        let x2 = (x1 + self.width as i64).min(image_width as i64);
        let y2 = (y1 + self.height as i64).min(image_height as i64);
        if x2 > x1 && y2 > y1 {
            Some(BoundingBox::new(x1 as u32, y1 as u32, x2 as u32, y2 as u32))
        } else {
            None
        }
    }
}

/// Corner coordinates `(x1, y1)` inclusive to `(x2, y2)` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Pixels cut from the source image for one selected region.
#[derive(Debug, Clone)]
pub struct Crop {
    pub image: RgbImage,
    pub source: RegionSource,
    pub bbox: BoundingBox,
}
