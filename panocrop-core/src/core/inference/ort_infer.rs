//! ONNX Runtime session pool shared by all model backends.

use crate::core::config::{OrtGraphOptimizationLevel, OrtSessionConfig};
use crate::core::errors::{CropError, CropResult};
use ort::logging::LogLevel;
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[path = "ort_infer_execution.rs"]
mod ort_infer_execution;

pub use ort_infer_execution::RawTensor;

/// A pool of ONNX Runtime sessions for one model file.
///
/// `Session::run` needs exclusive access, so each session sits behind its own mutex
/// and calls are spread across the pool round-robin.
pub struct OrtInfer {
    sessions: Vec<Mutex<Session>>,
    next_idx: AtomicUsize,
    model_path: PathBuf,
    model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("sessions", &self.sessions.len())
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OrtInfer {
    /// Opens a single session with default settings.
    pub fn new(model_path: impl AsRef<Path>) -> CropResult<Self> {
        Self::from_config(model_path, 1, None)
    }

    /// Opens `pool_size` sessions, applying `ort_config` to each.
    pub fn from_config(
        model_path: impl AsRef<Path>,
        pool_size: usize,
        ort_config: Option<&OrtSessionConfig>,
    ) -> CropResult<Self> {
        let path = model_path.as_ref();
        if !path.is_file() {
            return Err(CropError::model_load_error(
                path,
                "model file not found",
                Some("check the model path in the configuration"),
                None::<std::io::Error>,
            ));
        }

        let pool_size = pool_size.max(1);
        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let builder = Session::builder()?.with_log_level(LogLevel::Error)?;
            let builder = match ort_config {
                Some(cfg) => Self::apply_ort_config(builder, cfg)?,
                None => builder,
            };
            let session = builder.commit_from_file(path).map_err(|e| {
                CropError::model_load_error(
                    path,
                    "failed to create ONNX session",
                    Some("verify model file exists and is a valid ONNX graph"),
                    Some(e),
                )
            })?;
            sessions.push(Mutex::new(session));
        }

        let model_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown_model")
            .to_string();

        Ok(OrtInfer {
            sessions,
            next_idx: AtomicUsize::new(0),
            model_path: path.to_path_buf(),
            model_name,
        })
    }

    fn apply_ort_config(
        mut builder: SessionBuilder,
        cfg: &OrtSessionConfig,
    ) -> Result<SessionBuilder, ort::Error> {
        if let Some(intra) = cfg.intra_threads {
            builder = builder.with_intra_threads(intra)?;
        }
        if let Some(inter) = cfg.inter_threads {
            builder = builder.with_inter_threads(inter)?;
        }
        if let Some(par) = cfg.parallel_execution {
            builder = builder.with_parallel_execution(par)?;
        }
        if let Some(level) = cfg.optimization_level {
            let mapped = match level {
                OrtGraphOptimizationLevel::DisableAll => GraphOptimizationLevel::Disable,
                OrtGraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
                OrtGraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
                OrtGraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
            };
            builder = builder.with_optimization_level(mapped)?;
        }
        Ok(builder)
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Number of sessions in the pool.
    pub fn pool_size(&self) -> usize {
        self.sessions.len()
    }

    /// Runs `f` with exclusive access to the next session in the pool.
    pub fn with_session<T>(&self, f: impl FnOnce(&mut Session) -> CropResult<T>) -> CropResult<T> {
        let idx = self.next_idx.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut guard = self.sessions[idx].lock().map_err(|_| {
            CropError::inference_error(
                &self.model_name,
                &format!(
                    "failed to acquire session lock for session {}/{}",
                    idx,
                    self.sessions.len()
                ),
                crate::core::errors::SimpleError::new("session mutex poisoned"),
            )
        })?;
        f(&mut guard)
    }
}
