//! Standard locations for StemDeck configuration files

use std::path::PathBuf;

/// Get the configuration directory
///
/// Returns the platform config dir joined with `stemdeck`
/// (e.g. `~/.config/stemdeck` on Linux), or `./stemdeck` when the platform
/// has none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stemdeck")
}

/// Get the default path of a config file
///
/// # Arguments
/// * `filename` - Config file name (e.g., "engine.yaml")
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}
