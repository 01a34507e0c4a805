//! Configuration for BlockKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a BlockKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Working directory for all data files. Must already exist.
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── index.bin        (key → block layout index)
    ///     ├── value-index.bin  (segment counter + free-block pool)
    ///     └── data<N>          (segment files)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Segment Configuration
    // -------------------------------------------------------------------------
    /// Maximum size of a newly created segment file (in bytes).
    /// Values longer than this are split across multiple segments.
    /// Must be positive.
    pub segment_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./blockkv_data"),
            segment_size: 4 * 1024, // 4 KB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the working directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the maximum segment file size (in bytes)
    pub fn segment_size(mut self, size: u32) -> Self {
        self.config.segment_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
