use crate::enums::DecodePolicy;

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading pipeline config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing pipeline config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid pipeline config: {0}")]
    Invalid(&'static str),
}

/// Tunables of the reconstruction pipeline.
///
/// Every field has a default, so a YAML file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Extension of raw slice files inside the archive (case-insensitive).
    pub slice_extension: String,
    /// Edge length of the square rasters produced by the cropper.
    pub raster_size: u32,
    /// Rows at the bottom edge ignored when measuring foreground.
    pub bottom_band: u32,
    /// Model input shape (depth, height, width).
    pub target_shape: [usize; 3],
    pub decode_policy: DecodePolicy,
    /// File name of the packaged volume inside the processed directory.
    pub output_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            slice_extension: "dcm".to_string(),
            raster_size: 64,
            bottom_band: 3,
            target_shape: [64, 64, 64],
            decode_policy: DecodePolicy::Skip,
            output_name: "output.nii.gz".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: PipelineConfig =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.raster_size == 0 {
            return Err(ConfigError::Invalid("raster_size must be positive"));
        }
        if self.target_shape.contains(&0) {
            return Err(ConfigError::Invalid("target_shape must be positive on every axis"));
        }
        if self.output_name.is_empty() {
            return Err(ConfigError::Invalid("output_name must not be empty"));
        }
        Ok(())
    }
}
