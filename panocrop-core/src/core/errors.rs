//! Error types for the crop pipeline.
//!
//! Errors fall into two groups. Fatal errors (unreadable input, missing scoring
//! resources, bad configuration) are returned as [`CropError`] before any work is done.
//! Recoverable errors raised by a signal source or while analysing one crop are also
//! represented as [`CropError`], but the pipeline logs and absorbs them instead of
//! propagating.

use thiserror::Error;

/// Stage of the pipeline in which a processing error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Saliency map computation.
    Saliency,
    /// Contour extraction and region proposal.
    Proposal,
    /// Region ordering, clamping and cropping.
    Selection,
    /// Caption, style and score computation.
    Scoring,
    /// Image normalization for model input.
    Normalization,
    /// Tensor construction or reshaping.
    TensorOperation,
    /// Decoding of raw model output.
    PostProcessing,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Saliency => write!(f, "saliency"),
            ProcessingStage::Proposal => write!(f, "region proposal"),
            ProcessingStage::Selection => write!(f, "region selection"),
            ProcessingStage::Scoring => write!(f, "composition scoring"),
            ProcessingStage::Normalization => write!(f, "normalization"),
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
            ProcessingStage::PostProcessing => write!(f, "post-processing"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// A plain message error used as the source of wrapped errors that have no
/// underlying cause of their own.
#[derive(Debug, Clone)]
pub struct SimpleError(String);

impl SimpleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for SimpleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SimpleError {}

/// Errors produced anywhere in the crop pipeline.
#[derive(Error, Debug)]
pub enum CropError {
    /// The source image could not be read or decoded.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// A processing stage failed.
    #[error("{kind} failed: {context}")]
    Processing {
        kind: ProcessingStage,
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A model capability failed while running.
    #[error("inference failed in model '{model_name}': {context}")]
    Inference {
        model_name: String,
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A model or one of its resources could not be loaded.
    #[error("failed to load model from '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        model_path: String,
        reason: String,
        suggestion: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The caller supplied unusable input.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The configuration is invalid or incomplete.
    #[error("configuration: {message}")]
    ConfigError { message: String },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

/// Convenient result alias for crop pipeline operations.
pub type CropResult<T> = Result<T, CropError>;

impl CropError {
    #[inline]
    fn processing_with_context(
        kind: ProcessingStage,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a processing error for the given stage.
    pub fn processing_error(
        kind: ProcessingStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_with_context(kind, context, error)
    }

    /// Creates a processing error for tensor construction or reshaping.
    pub fn tensor_operation(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_with_context(ProcessingStage::TensorOperation, context, error)
    }

    /// Creates a processing error for decoding model output.
    pub fn post_processing(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_with_context(ProcessingStage::PostProcessing, context, error)
    }

    /// Creates a processing error for input normalization.
    pub fn normalization(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_with_context(ProcessingStage::Normalization, context, error)
    }

    /// Creates a scoring error without an underlying cause.
    pub fn scoring(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::processing_with_context(
            ProcessingStage::Scoring,
            message.clone(),
            SimpleError::new(message),
        )
    }

    /// Creates an inference error attributed to a named model.
    pub fn inference_error(
        model_name: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates a model loading error.
    ///
    /// # Arguments
    ///
    /// * `model_path` - The file or directory that failed to load.
    /// * `reason` - Short description of what went wrong.
    /// * `suggestion` - Optional hint appended to the message.
    /// * `source` - Optional underlying error.
    pub fn model_load_error(
        model_path: impl AsRef<std::path::Path>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        let suggestion = suggestion
            .map(|s| format!("; suggested fix: {}", s))
            .unwrap_or_default();
        Self::ModelLoad {
            model_path: model_path.as_ref().display().to_string(),
            reason: reason.into(),
            suggestion,
            source: source.map(|e| Box::new(e) as _),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates a validation error describing the expected and actual values.
    pub fn validation_error(component: &str, field: &str, expected: &str, actual: &str) -> Self {
        Self::InvalidInput {
            message: format!(
                "Validation failed in {}: field '{}' expected {}, but got '{}'",
                component, field, expected, actual
            ),
        }
    }
}

impl From<image::ImageError> for CropError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for CropError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_load_error_appends_suggestion() {
        let err = CropError::model_load_error(
            "models/clip",
            "tokenizer.json is missing",
            Some("download the tokenizer next to the model"),
            None::<std::io::Error>,
        );
        let message = err.to_string();
        assert!(message.contains("models/clip"));
        assert!(message.ends_with("; suggested fix: download the tokenizer next to the model"));
    }

    #[test]
    fn test_processing_error_display_names_stage() {
        let err = CropError::scoring("empty embedding");
        assert_eq!(err.to_string(), "composition scoring failed: empty embedding");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: CropError = crate::core::config::ConfigError::InvalidConfig {
            message: "top_n must be at least 1".to_string(),
        }
        .into();
        assert!(matches!(err, CropError::ConfigError { .. }));
    }
}
