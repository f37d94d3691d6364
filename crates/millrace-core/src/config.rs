//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tuning knobs for a pipeline, typically deserialized from the hosting
/// process's configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory relative cache paths resolve under. `None` leaves resolved
    /// paths as-is (absolute templates, or relative to the working
    /// directory).
    pub cache_root: Option<PathBuf>,

    /// Capacity of the chunk channel between a step function and its
    /// downstream reader. Bounds how far a producer can run ahead.
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_root: None,
            channel_capacity: 16,
        }
    }
}

impl PipelineConfig {
    /// Config with a cache root, defaults elsewhere.
    pub fn with_cache_root(root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: Some(root.into()),
            ..Self::default()
        }
    }
}
