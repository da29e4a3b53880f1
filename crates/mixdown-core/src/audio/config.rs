//! Audio backend configuration
//!
//! Device selection, output rate and buffer size for the CPAL backend.

use serde::{Deserialize, Serialize};

/// Largest callback buffer the backend pre-allocates for (frames)
///
/// Bigger device buffers are mixed in several passes.
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Default buffer size when no preference is specified (frames)
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Default output rate
///
/// 22050Hz is the rate most raw game sound effects are recorded at, so
/// they play without interpolation.
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

/// Preferred buffer size for audio streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Let the system choose the default buffer size
    #[default]
    Default,
    /// Request a specific buffer size in frames (may be adjusted by the system)
    Fixed(u32),
}

impl BufferSize {
    /// Get the buffer size in frames, or None for system default
    pub fn as_frames(&self) -> Option<u32> {
        match self {
            BufferSize::Default => None,
            BufferSize::Fixed(frames) => Some(*frames),
        }
    }

    /// Calculate latency in milliseconds for a given sample rate
    pub fn latency_ms(&self, sample_rate: u32) -> Option<f32> {
        self.as_frames()
            .map(|frames| (frames as f32 / sample_rate as f32) * 1000.0)
    }
}

/// Audio device identifier
///
/// Includes both the device name and the host backend (ALSA, PulseAudio,
/// CoreAudio, ...) so a device can be picked on systems with several hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Device name as reported by the system
    pub name: String,
    /// Audio host identifier; None searches every host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: Some(host.to_string()),
        }
    }

    /// Get a display label that includes the host if available
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Configuration for the audio backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device (None = system default)
    pub device: Option<DeviceId>,

    /// Preferred output rate (None = [`DEFAULT_SAMPLE_RATE`])
    pub sample_rate: Option<u32>,

    /// Preferred buffer size
    pub buffer_size: BufferSize,
}

impl AudioConfig {
    /// Set the output device
    pub fn with_device(mut self, device: DeviceId) -> Self {
        self.device = Some(device);
        self
    }

    /// Set the preferred buffer size
    pub fn with_buffer_size(mut self, size: BufferSize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set a fixed buffer size in frames
    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = BufferSize::Fixed(frames);
        self
    }

    /// Set the preferred sample rate
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    /// The rate to ask the device for
    pub fn target_sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AudioConfig::default();
        assert_eq!(config.target_sample_rate(), DEFAULT_SAMPLE_RATE);
        assert_eq!(config.buffer_size.as_frames(), None);
        assert!(config.device.is_none());
    }

    #[test]
    fn test_builder() {
        let config = AudioConfig::default()
            .with_device(DeviceId::with_host("hw:0,0", "ALSA"))
            .with_sample_rate(44100)
            .with_buffer_frames(256);
        assert_eq!(config.target_sample_rate(), 44100);
        assert_eq!(config.buffer_size, BufferSize::Fixed(256));
        assert_eq!(config.device.unwrap().display_label(), "[ALSA] hw:0,0");
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: AudioConfig = serde_yaml::from_str("sample_rate: 48000\n").unwrap();
        assert_eq!(config.sample_rate, Some(48000));
        assert_eq!(config.buffer_size, BufferSize::Default);
    }

    #[test]
    fn test_latency() {
        let latency = BufferSize::Fixed(441).latency_ms(44100).unwrap();
        assert!((latency - 10.0).abs() < 0.001);
        assert_eq!(BufferSize::Default.latency_ms(44100), None);
    }
}
