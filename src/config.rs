//! File-based configuration.
//!
//! ```toml
//! [compression]
//! max_width = 1920
//! max_height = 1080
//! quality = 0.8
//! output_format = "image/jpeg"
//! maintain_aspect_ratio = true
//! skip_threshold_kib = 300
//!
//! [batch]
//! max_parallelism = 4
//! memory_headroom_mib = 512
//! ```
//!
//! Every key is optional. Command-line flags override the file.

use crate::codec::ImageCodec;
use crate::constants::{DEFAULT_SKIP_THRESHOLD_BYTES, MIN_AVAILABLE_MEMORY_MIB};
use crate::error::{CompressionError, Result};
use crate::processing::{CompressionOptions, ImageCompressor};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressorConfig {
    pub compression: CompressionSection,
    pub batch: BatchSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionSection {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    pub quality: Option<f32>,
    pub output_format: Option<String>,
    pub maintain_aspect_ratio: Option<bool>,
    pub skip_threshold_kib: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchSection {
    pub max_parallelism: Option<usize>,
    pub memory_headroom_mib: Option<u64>,
}

impl CompressorConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| CompressionError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CompressionError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Load `path` when given, otherwise start from defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate the `[compression]` section into options.
    pub fn compression_options(&self) -> Result<CompressionOptions> {
        let section = &self.compression;
        let options = CompressionOptions::new(
            section.max_width,
            section.max_height,
            section.quality,
            section.output_format.as_deref(),
            section.maintain_aspect_ratio,
        )?;

        let threshold = section
            .skip_threshold_kib
            .map(|kib| kib.saturating_mul(1024))
            .unwrap_or(DEFAULT_SKIP_THRESHOLD_BYTES);
        Ok(options.with_skip_threshold(threshold))
    }

    /// Apply the `[batch]` section to a compressor.
    pub fn configure<C: ImageCodec>(&self, compressor: ImageCompressor<C>) -> ImageCompressor<C> {
        let headroom = self
            .batch
            .memory_headroom_mib
            .unwrap_or(MIN_AVAILABLE_MEMORY_MIB);
        let compressor = compressor.with_memory_headroom_mib(headroom);
        match self.batch.max_parallelism {
            Some(threads) => compressor.with_max_parallelism(threads),
            None => compressor,
        }
    }
}
