//! Configuration error types and validation traits.

use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A model file does not exist.
    #[error("model path does not exist: {path}")]
    ModelPathNotFound { path: std::path::PathBuf },

    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Validation of a composed configuration failed.
    #[error("validation failed: {message}")]
    ValidationFailed { message: String },

    /// A requested amount exceeds a configured limit.
    #[error("resource limit exceeded: {message}")]
    ResourceLimitExceeded { message: String },
}

/// A trait for validating configuration parameters.
///
/// Usually implemented through `#[derive(ConfigValidator)]`; composed configurations
/// implement it by hand and delegate to their parts.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// Checks that `path` exists and is a file.
    fn validate_model_path(&self, path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            Err(ConfigError::ModelPathNotFound {
                path: path.to_path_buf(),
            })
        } else if !path.is_file() {
            Err(ConfigError::InvalidConfig {
                message: format!("Model path is not a file: {}", path.display()),
            })
        } else {
            Ok(())
        }
    }

    /// Checks that `dir` exists and is a directory.
    fn validate_model_dir(&self, dir: &Path) -> Result<(), ConfigError> {
        if !dir.exists() {
            Err(ConfigError::ModelPathNotFound {
                path: dir.to_path_buf(),
            })
        } else if !dir.is_dir() {
            Err(ConfigError::InvalidConfig {
                message: format!("Model directory is not a directory: {}", dir.display()),
            })
        } else {
            Ok(())
        }
    }

    /// Checks that a requested count is positive and within `limit`.
    fn validate_count_with_limit(
        &self,
        name: &str,
        requested: usize,
        limit: usize,
    ) -> Result<(), ConfigError> {
        if requested == 0 {
            return Err(ConfigError::InvalidConfig {
                message: format!("{} must be greater than 0", name),
            });
        }
        if requested > limit {
            return Err(ConfigError::ResourceLimitExceeded {
                message: format!(
                    "{} {} exceeds maximum allowed value {}",
                    name, requested, limit
                ),
            });
        }
        Ok(())
    }
}
