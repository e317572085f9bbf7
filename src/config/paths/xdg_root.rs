//! Platform directory resolution for configuration and state files.

use std::path::PathBuf;

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "notetree", "notetree")
}

/// Get config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise the platform config directory.
pub fn config_home() -> Option<PathBuf> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Some(PathBuf::from(xdg_config_home).join("notetree"));
        }
    }
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Path of the global config file (`config.toml` under the config home)
pub fn global_config_path() -> Option<PathBuf> {
    config_home().map(|dir| dir.join("config.toml"))
}

/// Directory for runtime state such as log files
///
/// Falls back to the data-local directory on platforms without a state dir.
pub fn state_home() -> Option<PathBuf> {
    project_dirs().map(|dirs| {
        dirs.state_dir()
            .unwrap_or_else(|| dirs.data_local_dir())
            .to_path_buf()
    })
}
