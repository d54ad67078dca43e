//! Binarization and external-contour extraction for region proposal.

use image::{GrayImage, imageops};
use imageproc::contours::{BorderType, find_contours};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::point::Point;

/// Binarizes `map` with Otsu's method: pixels strictly above the level become 255.
///
/// Returns the level together with the mask.
pub fn otsu_binarize(map: &GrayImage) -> (u8, GrayImage) {
    let level = otsu_level(map);
    (level, threshold(map, level, ThresholdType::Binary))
}

/// Bounding rectangle and enclosed area of one outer contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Polygon area of the traced border, which for a filled `w x h` block of
    /// pixels is `(w - 1) * (h - 1)`.
    pub area: f64,
}

/// Shoelace area of a closed polygon.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

/// Smallest upright rectangle containing every point, counted in whole pixels.
pub fn bounding_rect(points: &[Point<i32>]) -> Option<(i32, i32, i32, i32)> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some((min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Traces the outermost borders of the foreground in `mask`, ignoring holes and
/// anything nested inside them.
///
/// The mask is traced inside a 1 px background frame so components touching the
/// image edge still get an outer border.
pub fn external_contours(mask: &GrayImage) -> Vec<ContourRect> {
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    imageops::replace(&mut padded, mask, 1, 1);

    find_contours::<i32>(&padded)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| {
            let points: Vec<Point<i32>> = c
                .points
                .iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect();
            let (x, y, width, height) = bounding_rect(&points)?;
            Some(ContourRect {
                x,
                y,
                width,
                height,
                area: polygon_area(&points),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn mask_with_blocks(blocks: &[(u32, u32, u32, u32)]) -> GrayImage {
        let mut mask = GrayImage::new(120, 80);
        for &(x0, y0, w, h) in blocks {
            for y in y0..y0 + h {
                for x in x0..x0 + w {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }
        mask
    }

    #[test]
    fn test_polygon_area_of_square() {
        let pts = vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_eq!(polygon_area(&pts), 100.0);
        assert_eq!(polygon_area(&pts[..2]), 0.0);
    }

    #[test]
    fn test_external_contours_of_two_blocks() {
        let mask = mask_with_blocks(&[(10, 10, 30, 20), (70, 40, 20, 20)]);
        let mut rects = external_contours(&mask);
        rects.sort_by_key(|r| r.x);
        assert_eq!(rects.len(), 2);
        assert_eq!((rects[0].x, rects[0].y, rects[0].width, rects[0].height), (10, 10, 30, 20));
        assert_eq!(rects[0].area, 29.0 * 19.0);
        assert_eq!((rects[1].x, rects[1].y, rects[1].width, rects[1].height), (70, 40, 20, 20));
    }

    #[test]
    fn test_hole_contents_are_not_external() {
        let mut mask = mask_with_blocks(&[(10, 10, 60, 60)]);
        for y in 20..60 {
            for x in 20..60 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        for y in 35..45 {
            for x in 35..45 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let rects = external_contours(&mask);
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].width, 60);
    }

    #[test]
    fn test_blocks_touching_the_frame_are_kept() {
        let mask = mask_with_blocks(&[(0, 0, 60, 60), (100, 30, 20, 50)]);
        let mut rects = external_contours(&mask);
        rects.sort_by_key(|r| r.x);
        assert_eq!(rects.len(), 2);
        assert_eq!((rects[0].x, rects[0].y, rects[0].width, rects[0].height), (0, 0, 60, 60));
        assert_eq!(rects[0].area, 59.0 * 59.0);
        assert_eq!((rects[1].x, rects[1].y, rects[1].width, rects[1].height), (100, 30, 20, 50));
    }

    #[test]
    fn test_full_mask_is_one_contour() {
        let mask = mask_with_blocks(&[(0, 0, 120, 80)]);
        let rects = external_contours(&mask);
        assert_eq!(rects.len(), 1);
        assert_eq!((rects[0].x, rects[0].y, rects[0].width, rects[0].height), (0, 0, 120, 80));
    }

    #[test]
    fn test_otsu_separates_two_levels() {
        let mut map = GrayImage::new(20, 20);
        for y in 0..20 {
            for x in 10..20 {
                map.put_pixel(x, y, Luma([220]));
            }
        }
        let (level, mask) = otsu_binarize(&map);
        assert!(level < 220);
        assert_eq!(mask.get_pixel(15, 5)[0], 255);
        assert_eq!(mask.get_pixel(5, 5)[0], 0);
    }

    #[test]
    fn test_zero_map_has_no_foreground() {
        let (_, mask) = otsu_binarize(&GrayImage::new(16, 16));
        assert!(mask.pixels().all(|p| p[0] == 0));
    }
}
