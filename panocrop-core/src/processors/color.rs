//! sRGB to 8-bit CIE Lab conversion.
//!
//! The 8-bit encoding stores `L * 255 / 100` in the first channel and `a + 128`,
//! `b + 128` in the others, so every channel fits in `u8`. Saliency statistics are
//! computed on these quantized values.

use image::{ImageBuffer, Rgb, RgbImage};

/// Image whose three channels hold 8-bit encoded L, a and b.
pub type Lab8Image = ImageBuffer<Rgb<u8>, Vec<u8>>;

// D65 reference white
const WHITE_X: f32 = 0.950456;
const WHITE_Z: f32 = 1.088754;
const EPSILON: f32 = 0.008856;

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn lab_f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

/// Converts one sRGB pixel to 8-bit Lab.
pub fn rgb_to_lab8_pixel(rgb: [u8; 3]) -> [u8; 3] {
    let r = srgb_to_linear(rgb[0] as f32 / 255.0);
    let g = srgb_to_linear(rgb[1] as f32 / 255.0);
    let b = srgb_to_linear(rgb[2] as f32 / 255.0);

    let x = (0.412453 * r + 0.357580 * g + 0.180423 * b) / WHITE_X;
    let y = 0.212671 * r + 0.715160 * g + 0.072169 * b;
    let z = (0.019334 * r + 0.119193 * g + 0.950227 * b) / WHITE_Z;

    let fx = lab_f(x);
    let fy = lab_f(y);
    let fz = lab_f(z);

    let l = if y > EPSILON {
        116.0 * fy - 16.0
    } else {
        903.3 * y
    };
    let a = 500.0 * (fx - fy) + 128.0;
    let bb = 200.0 * (fy - fz) + 128.0;

    let quantize = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    [quantize(l * 255.0 / 100.0), quantize(a), quantize(bb)]
}

/// Converts a whole image to 8-bit Lab.
pub fn rgb_to_lab8(image: &RgbImage) -> Lab8Image {
    let mut out = Lab8Image::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(out.pixels_mut()) {
        *dst = Rgb(rgb_to_lab8_pixel(src.0));
    }
    out
}
