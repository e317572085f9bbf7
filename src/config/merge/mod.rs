//! Merge policy and service for layered configuration.

pub mod service;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Builder seeded with the defaults every layer overrides.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("view.path", "/")?
        .set_default("view.depth", 99)?
        .set_default("view.index_label", "index")?
        .set_default("view.show_links", true)?
        .set_default("watch.debounce_ms", 200)
}
