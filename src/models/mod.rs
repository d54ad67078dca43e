//! ONNX Runtime implementations of the model capabilities.

pub mod detector;
pub mod embedder;
pub mod saliency;
pub mod segmenter;
pub mod text_scorer;

pub use detector::YoloObjectDetector;
pub use embedder::ClipEmbedder;
pub use saliency::OnnxSaliencyModel;
pub use segmenter::DeepLabSegmenter;
pub use text_scorer::BertTextScorer;
