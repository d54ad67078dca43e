//! Image loading, slicing and encoding helpers.

use crate::core::errors::{CropError, CropResult};
use crate::domain::BoundingBox;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use std::path::Path;

/// Converts a DynamicImage to an RgbImage.
pub fn dynamic_to_rgb(img: DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Loads an image from a file path and converts it to RgbImage.
///
/// # Errors
///
/// Returns `CropError::ImageLoad` if the file cannot be opened or decoded.
pub fn load_image(path: &Path) -> CropResult<RgbImage> {
    let img = image::open(path).map_err(CropError::ImageLoad)?;
    Ok(dynamic_to_rgb(img))
}

/// Copies the pixels inside `bbox` out of `image`.
///
/// The box is intersected with the image first, so an overhanging box yields the
/// visible part only.
pub fn crop_image(image: &RgbImage, bbox: &BoundingBox) -> RgbImage {
    let x1 = bbox.x1.min(image.width());
    let y1 = bbox.y1.min(image.height());
    let x2 = bbox.x2.min(image.width()).max(x1);
    let y2 = bbox.y2.min(image.height()).max(y1);
    image::imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image()
}

/// Encodes `image` as JPEG with the given quality (1-100).
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> CropResult<Vec<u8>> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(CropError::ImageLoad)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_crop_image_extracts_region() {
        let mut image = RgbImage::new(10, 10);
        image.put_pixel(4, 3, Rgb([9, 9, 9]));
        let crop = crop_image(&image, &BoundingBox::new(4, 3, 8, 10));
        assert_eq!(crop.dimensions(), (4, 7));
        assert_eq!(crop.get_pixel(0, 0), &Rgb([9, 9, 9]));
    }

    #[test]
    fn test_crop_image_intersects_with_bounds() {
        let image = RgbImage::new(10, 10);
        let crop = crop_image(&image, &BoundingBox::new(8, 8, 20, 20));
        assert_eq!(crop.dimensions(), (2, 2));
    }

    #[test]
    fn test_encode_jpeg_produces_jfif() -> CropResult<()> {
        let bytes = encode_jpeg(&RgbImage::from_pixel(16, 16, Rgb([200, 10, 10])), 85)?;
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        Ok(())
    }

    #[test]
    fn test_load_missing_image_fails() {
        let result = load_image(Path::new("/nonexistent/panorama.jpg"));
        assert!(matches!(result, Err(CropError::ImageLoad(_))));
    }
}
