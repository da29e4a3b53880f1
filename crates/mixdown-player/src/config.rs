//! Player configuration
//!
//! Stored as YAML in the user's config directory.
//! Default location: ~/.config/mixdown/player.yaml

use std::path::PathBuf;

use mixdown_core::audio::AudioConfig;
use mixdown_core::config::MixerSettings;
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Output device, rate and buffer size
    pub audio: AudioConfig,
    /// Initial mixer volumes
    pub mixer: MixerSettings,
}

/// Returns: ~/.config/mixdown/player.yaml
pub fn default_config_path() -> PathBuf {
    mixdown_core::config::default_config_path("player.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixdown_core::audio::DEFAULT_SAMPLE_RATE;
    use mixdown_core::config::{load_config, save_config};

    #[test]
    fn test_default_config() {
        let config = PlayerConfig::default();
        assert_eq!(config.audio.target_sample_rate(), DEFAULT_SAMPLE_RATE);
        assert_eq!(config.mixer.volume, 256);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player.yaml");

        let config = PlayerConfig {
            audio: AudioConfig::default().with_sample_rate(44100),
            mixer: MixerSettings {
                volume: 200,
                music_volume: 100,
            },
        };
        save_config(&config, &path).unwrap();

        let loaded: PlayerConfig = load_config(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_other_sections() {
        let config: PlayerConfig = serde_yaml::from_str("mixer:\n  volume: 64\n").unwrap();
        assert_eq!(config.mixer.volume, 64);
        assert_eq!(config.mixer.music_volume, 256);
        assert_eq!(config.audio, AudioConfig::default());
    }
}
