//! Configuration
//!
//! Layered settings for the cache front-ends: which snapshot to load, default
//! view parameters, watch debounce and logging. Sources are merged by
//! [`merge::service::MergeService`].

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default projection parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_view_path")]
    pub path: String,
    #[serde(default = "default_view_depth")]
    pub depth: u32,
    /// Item label promoted to its container's link when rendering
    #[serde(default = "default_index_label")]
    pub index_label: String,
    #[serde(default = "default_true")]
    pub show_links: bool,
}

fn default_view_path() -> String {
    "/".to_string()
}

fn default_view_depth() -> u32 {
    99
}

fn default_index_label() -> String {
    "index".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            path: default_view_path(),
            depth: default_view_depth(),
            index_label: default_index_label(),
            show_links: default_true(),
        }
    }
}

/// Snapshot watch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Quiet period before a changed snapshot is reloaded
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    200
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteTreeConfig {
    /// JSON record snapshot backing the file store
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}
