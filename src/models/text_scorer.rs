//! BERT regression head that maps a caption to a composition score.

use super::embedder::{load_tokenizer, tokenize_padded};
use panocrop_core::core::config::OrtSessionConfig;
use panocrop_core::core::constants::TEXT_SCORER_MAX_TOKENS;
use panocrop_core::core::errors::{CropError, CropResult};
use panocrop_core::core::inference::OrtInfer;
use panocrop_core::core::traits::{CapabilityInfo, CapabilityKind, TextScorer};
use std::path::Path;
use tokenizers::Tokenizer;

pub const SCORER_MODEL_FILE: &str = "model.onnx";

/// Single-logit sequence regressor.
#[derive(Debug)]
pub struct BertTextScorer {
    inference: OrtInfer,
    tokenizer: Tokenizer,
    max_tokens: usize,
}

impl BertTextScorer {
    pub fn new(inference: OrtInfer, tokenizer: Tokenizer) -> Self {
        Self {
            inference,
            tokenizer,
            max_tokens: TEXT_SCORER_MAX_TOKENS,
        }
    }

    /// Opens `model.onnx` and `tokenizer.json` from `dir`.
    pub fn from_dir(
        dir: &Path,
        pool_size: usize,
        ort_config: Option<&OrtSessionConfig>,
    ) -> CropResult<Self> {
        let model_path = dir.join(SCORER_MODEL_FILE);
        let tokenizer_path = dir.join(super::embedder::TOKENIZER_FILE);
        if !tokenizer_path.is_file() {
            return Err(CropError::model_load_error(
                &tokenizer_path,
                "tokenizer.json not found in text scorer directory",
                None,
                None::<std::io::Error>,
            ));
        }
        let inference = OrtInfer::from_config(&model_path, pool_size, ort_config)?;
        Ok(Self::new(inference, load_tokenizer(&tokenizer_path)?))
    }
}

impl TextScorer for BertTextScorer {
    fn score_text(&self, text: &str) -> CropResult<f32> {
        // the caption alone decides the sequence length, no padding needed
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| CropError::invalid_input(format!("failed to tokenize caption: {}", e)))?;
        let length = encoding.get_ids().len().clamp(1, self.max_tokens);
        let (ids, mask, types) = tokenize_padded(&self.tokenizer, &[text.to_string()], length, 0)?;

        let output = self.inference.infer_tokens(
            &[
                ("input_ids", ids),
                ("attention_mask", mask),
                ("token_type_ids", types),
            ],
            Some("logits"),
        )?;
        output.data.first().copied().ok_or_else(|| {
            CropError::inference_error(
                self.inference.model_name(),
                "text scorer returned no logits",
                panocrop_core::core::errors::SimpleError::new("empty output"),
            )
        })
    }

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new(
            self.inference.model_name(),
            CapabilityKind::TextScoring,
            "BERT sequence regressor",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tokenizer_is_load_error() {
        let err = BertTextScorer::from_dir(Path::new("/nonexistent/bert"), 1, None).unwrap_err();
        assert!(matches!(err, CropError::ModelLoad { .. }));
    }
}
