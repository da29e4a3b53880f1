//! YAML configuration I/O
//!
//! Works with any serde configuration type that has a `Default`.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Load configuration from a YAML file
///
/// A missing file yields the default config. An unreadable or invalid file
/// is logged and also yields the default, so a broken config never keeps
/// the program from starting.
///
/// ```ignore
/// let config: PlayerConfig = load_config(&default_config_path("player.yaml"));
/// ```
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("load_config: {:?} not found, using defaults", path);
        return T::default();
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            log::warn!("load_config: failed to read {:?}: {}, using defaults", path, e);
            return T::default();
        }
    };

    match serde_yaml::from_str::<T>(&contents) {
        Ok(config) => {
            log::info!("load_config: loaded {:?}", path);
            config
        }
        Err(e) => {
            log::warn!("load_config: failed to parse {:?}: {}, using defaults", path, e);
            T::default()
        }
    }
}

/// Save configuration to a YAML file, creating parent directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("save_config: saved {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioConfig, BufferSize};
    use crate::config::MixerSettings;

    #[test]
    fn test_load_nonexistent_returns_default() {
        let settings: MixerSettings = load_config(Path::new("/nonexistent/path/mixer.yaml"));
        assert_eq!(settings, MixerSettings::default());
    }

    #[test]
    fn test_invalid_yaml_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixer.yaml");
        std::fs::write(&path, "volume: [not, a, number").unwrap();

        let settings: MixerSettings = load_config(&path);
        assert_eq!(settings, MixerSettings::default());
    }

    #[test]
    fn test_roundtrip_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("audio.yaml");

        let config = AudioConfig::default()
            .with_sample_rate(11025)
            .with_buffer_size(BufferSize::Fixed(1024));
        save_config(&config, &path).unwrap();

        let loaded: AudioConfig = load_config(&path);
        assert_eq!(loaded, config);
    }
}
