//! # Configuration Management
//!
//! Tunables for the segmenter, the reading windows requested from the store,
//! and the worker pool, loaded from a `trap-vision.toml` file. Every field has
//! a default matching the reference constants, so an absent file is never an
//! error.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "trap-vision.toml";

/// Application configuration loaded from `trap-vision.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub segmenter: SegmenterConfig,
    pub community: WindowConfig,
    pub workers: WorkerConfig,
    /// Default `tracing` filter for the binary; `RUST_LOG` wins when set.
    pub log_level: String,
}

/// Image segmentation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Longer image side after the fit-inside resize. Smaller images are kept as-is.
    pub target_dimension: u32,
    /// A pixel is dark iff its intensity is strictly below this value.
    pub dark_threshold: u8,
    /// Components smaller than this many pixels are discarded as noise.
    pub min_blob_size: usize,
    /// Length cap on the reported blob size list. Does not affect the count.
    pub max_reported_blobs: usize,
}

/// How many readings are requested from the store for each analysis.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowConfig {
    pub individual_limit: usize,
    pub recent_limit: usize,
    pub all_limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Segmentation workers; `None` means one per logical CPU.
    pub count: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            segmenter: SegmenterConfig::default(),
            community: WindowConfig::default(),
            workers: WorkerConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            target_dimension: 640,
            dark_threshold: 90,
            min_blob_size: 10,
            max_reported_blobs: 50,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            individual_limit: 20,
            recent_limit: 50,
            all_limit: 100,
        }
    }
}

impl WorkerConfig {
    pub fn resolved_count(&self) -> usize {
        self.count.unwrap_or_else(num_cpus::get).max(1)
    }
}

impl AppConfig {
    /// Load configuration from the given path.
    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no config file found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
