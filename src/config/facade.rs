//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::NoteTreeConfig;
use config::ConfigError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the global file and environment.
    pub fn load() -> Result<NoteTreeConfig, ConfigError> {
        MergeService::load(None)
    }

    /// Load configuration, layering an explicit file over the global one.
    pub fn load_with_file(path: &Path) -> Result<NoteTreeConfig, ConfigError> {
        MergeService::load(Some(path))
    }

    /// Load configuration from a specific file only (plus environment).
    pub fn load_from_file(path: &Path) -> Result<NoteTreeConfig, ConfigError> {
        MergeService::load_from_file(path)
    }

    /// Create default configuration.
    pub fn default() -> NoteTreeConfig {
        NoteTreeConfig::default()
    }
}
