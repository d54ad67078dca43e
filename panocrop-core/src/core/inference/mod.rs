//! ONNX Runtime plumbing used by the model backends.

pub mod ort_infer;

pub use ort_infer::{OrtInfer, RawTensor};
