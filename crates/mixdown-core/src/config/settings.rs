//! Mixer settings
//!
//! Initial global volumes applied when the mixer is created.

use serde::{Deserialize, Serialize};

use crate::types::MAX_MIXER_VOLUME;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerSettings {
    /// Sound-effect volume, 0-256
    pub volume: i32,
    /// Music volume, 0-256
    pub music_volume: i32,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            volume: MAX_MIXER_VOLUME,
            music_volume: MAX_MIXER_VOLUME,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_full_volume() {
        let settings = MixerSettings::default();
        assert_eq!(settings.volume, 256);
        assert_eq!(settings.music_volume, 256);
    }

    #[test]
    fn test_missing_fields_keep_defaults() {
        let settings: MixerSettings = serde_yaml::from_str("music_volume: 128\n").unwrap();
        assert_eq!(settings.volume, 256);
        assert_eq!(settings.music_volume, 128);
    }
}
