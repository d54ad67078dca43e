//! CLIP image-text embedder backed by separate vision and text ONNX graphs.
//!
//! The model directory holds `vision.onnx`, `text.onnx` and a HuggingFace
//! `tokenizer.json`.

use panocrop_core::core::config::OrtSessionConfig;
use panocrop_core::core::constants::{CLIP_CONTEXT_LENGTH, CLIP_IMAGE_INPUT, CLIP_MEAN, CLIP_STD};
use panocrop_core::core::errors::{CropError, CropResult, SimpleError};
use panocrop_core::core::inference::OrtInfer;
use panocrop_core::core::traits::{CapabilityInfo, CapabilityKind, ImageTextEmbedder};
use panocrop_core::processors::NormalizeImage;
use image::RgbImage;
use image::imageops::FilterType;
use ndarray::Array2;
use std::path::Path;
use tokenizers::Tokenizer;

pub const VISION_MODEL_FILE: &str = "vision.onnx";
pub const TEXT_MODEL_FILE: &str = "text.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Loads a HuggingFace tokenizer, reporting failures as model load errors.
pub(crate) fn load_tokenizer(path: &Path) -> CropResult<Tokenizer> {
    Tokenizer::from_file(path).map_err(|e| {
        CropError::model_load_error(
            path,
            "failed to load tokenizer",
            Some("export tokenizer.json alongside the ONNX model"),
            Some(SimpleError::new(e.to_string())),
        )
    })
}

/// Ids and attention masks of `texts`, truncated and right-padded to `length`.
pub(crate) fn tokenize_padded(
    tokenizer: &Tokenizer,
    texts: &[String],
    length: usize,
    pad_id: u32,
) -> CropResult<(Array2<i64>, Array2<i64>, Array2<i64>)> {
    let mut ids = Vec::with_capacity(texts.len() * length);
    let mut mask = Vec::with_capacity(texts.len() * length);
    let mut types = Vec::with_capacity(texts.len() * length);
    for text in texts {
        let encoding = tokenizer.encode(text.as_str(), true).map_err(|e| {
            CropError::invalid_input(format!("failed to tokenize '{}': {}", text, e))
        })?;
        let n = encoding.get_ids().len().min(length);
        ids.extend(encoding.get_ids()[..n].iter().map(|&id| id as i64));
        mask.extend(encoding.get_attention_mask()[..n].iter().map(|&m| m as i64));
        types.extend(encoding.get_type_ids()[..n].iter().map(|&t| t as i64));
        ids.extend(std::iter::repeat_n(pad_id as i64, length - n));
        mask.extend(std::iter::repeat_n(0, length - n));
        types.extend(std::iter::repeat_n(0, length - n));
    }
    let shape = (texts.len(), length);
    Ok((
        Array2::from_shape_vec(shape, ids)?,
        Array2::from_shape_vec(shape, mask)?,
        Array2::from_shape_vec(shape, types)?,
    ))
}

fn require_file(dir: &Path, name: &str) -> CropResult<std::path::PathBuf> {
    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(CropError::model_load_error(
            &path,
            format!("{} not found in model directory", name),
            Some("point embedding_model_dir at an exported CLIP model"),
            None::<std::io::Error>,
        ))
    }
}

/// Joint image-text embedder.
#[derive(Debug)]
pub struct ClipEmbedder {
    vision: OrtInfer,
    text: OrtInfer,
    tokenizer: Tokenizer,
    normalizer: NormalizeImage,
    pad_id: u32,
}

impl ClipEmbedder {
    pub fn new(vision: OrtInfer, text: OrtInfer, tokenizer: Tokenizer) -> CropResult<Self> {
        let pad_id = tokenizer
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| tokenizer.token_to_id("<|endoftext|>"))
            .unwrap_or(0);
        Ok(Self {
            vision,
            text,
            tokenizer,
            normalizer: NormalizeImage::new(CLIP_MEAN, CLIP_STD)?,
            pad_id,
        })
    }

    /// Opens the vision and text graphs and the tokenizer found in `dir`.
    pub fn from_dir(
        dir: &Path,
        pool_size: usize,
        ort_config: Option<&OrtSessionConfig>,
    ) -> CropResult<Self> {
        let vision = OrtInfer::from_config(require_file(dir, VISION_MODEL_FILE)?, pool_size, ort_config)?;
        let text = OrtInfer::from_config(require_file(dir, TEXT_MODEL_FILE)?, pool_size, ort_config)?;
        let tokenizer = load_tokenizer(&require_file(dir, TOKENIZER_FILE)?)?;
        Self::new(vision, text, tokenizer)
    }
}

/// Resizes the shorter side to `size` and center-crops a `size` x `size` square.
pub fn resize_center_crop(image: &RgbImage, size: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    let scale = size as f32 / w.min(h).max(1) as f32;
    let rw = ((w as f32 * scale).round() as u32).max(size);
    let rh = ((h as f32 * scale).round() as u32).max(size);
    let resized = image::imageops::resize(image, rw, rh, FilterType::CatmullRom);
    image::imageops::crop_imm(&resized, (rw - size) / 2, (rh - size) / 2, size, size).to_image()
}

impl ImageTextEmbedder for ClipEmbedder {
    fn embed_image(&self, image: &RgbImage) -> CropResult<Vec<f32>> {
        let input = self
            .normalizer
            .apply(&resize_center_crop(image, CLIP_IMAGE_INPUT));
        let output = self.vision.infer_4d_output(&input, Some("image_embeds"))?;
        output
            .into_rows()?
            .into_iter()
            .next()
            .ok_or_else(|| CropError::invalid_input("vision model returned an empty batch"))
    }

    fn embed_text(&self, texts: &[String]) -> CropResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let (ids, mask, _) =
            tokenize_padded(&self.tokenizer, texts, CLIP_CONTEXT_LENGTH, self.pad_id)?;
        self.text
            .infer_tokens(
                &[("input_ids", ids), ("attention_mask", mask)],
                Some("text_embeds"),
            )?
            .into_rows()
    }

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new(
            self.vision.model_name(),
            CapabilityKind::ImageTextEmbedding,
            "CLIP vision and text encoders",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_center_crop_is_square() {
        let wide = RgbImage::new(640, 320);
        assert_eq!(resize_center_crop(&wide, 224).dimensions(), (224, 224));
        let tall = RgbImage::new(50, 300);
        assert_eq!(resize_center_crop(&tall, 224).dimensions(), (224, 224));
    }

    #[test]
    fn test_missing_directory_is_load_error() {
        let err = ClipEmbedder::from_dir(Path::new("/nonexistent/clip"), 1, None).unwrap_err();
        assert!(matches!(err, CropError::ModelLoad { .. }));
        assert!(err.to_string().contains("vision.onnx"));
    }
}
