//! Loading and saving [`PipelineConfig`] as TOML or JSON.

use super::{ConfigValidator, PipelineConfig};
use crate::core::errors::CropError;
use std::path::Path;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Reads and writes pipeline configuration files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads a configuration file, picking the format from its extension, and
    /// validates the result.
    ///
    /// ```rust,no_run
    /// use panocrop_core::core::config::ConfigLoader;
    /// use std::path::Path;
    ///
    /// let config = ConfigLoader::load_from_file(Path::new("panocrop.toml"))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_from_file(path: &Path) -> Result<PipelineConfig, CropError> {
        let format = ConfigFormat::from_extension(path).ok_or_else(|| {
            CropError::config_error(format!(
                "Unsupported config file extension: {:?}",
                path.extension()
            ))
        })?;

        let content = std::fs::read_to_string(path).map_err(|e| {
            CropError::config_error(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::load_from_string(&content, format)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_string(content: &str, format: ConfigFormat) -> Result<PipelineConfig, CropError> {
        match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| {
                CropError::config_error(format!("Failed to parse TOML config: {e}"))
            }),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| {
                CropError::config_error(format!("Failed to parse JSON config: {e}"))
            }),
        }
    }

    /// Writes `config` to `path`, picking the format from its extension.
    pub fn save_to_file(config: &PipelineConfig, path: &Path) -> Result<(), CropError> {
        let format = ConfigFormat::from_extension(path).ok_or_else(|| {
            CropError::config_error(format!(
                "Unsupported config file extension: {:?}",
                path.extension()
            ))
        })?;

        let content = Self::save_to_string(config, format)?;

        std::fs::write(path, content).map_err(|e| {
            CropError::config_error(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    pub fn save_to_string(config: &PipelineConfig, format: ConfigFormat) -> Result<String, CropError> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| {
                CropError::config_error(format!("Failed to serialize config to TOML: {e}"))
            }),
            ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| {
                CropError::config_error(format!("Failed to serialize config to JSON: {e}"))
            }),
        }
    }
}
