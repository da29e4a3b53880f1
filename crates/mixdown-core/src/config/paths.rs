//! Path utilities for configuration files

use std::path::PathBuf;

/// Per-user configuration directory
///
/// Returns: `<platform config dir>/mixdown` (e.g. `~/.config/mixdown`),
/// or `./mixdown` when the platform has none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mixdown")
}

/// Get the default config file path for a given file name
///
/// # Arguments
/// * `filename` - Config file name (e.g., "player.yaml")
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}
