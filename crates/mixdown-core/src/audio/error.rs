//! Audio backend error types

use thiserror::Error;

/// Errors that can occur while opening a backend or binding the mixer to it
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio devices available
    #[error("No audio output devices found")]
    NoDevices,

    /// Failed to get default device
    #[error("Failed to get default audio device: {0}")]
    NoDefaultDevice(String),

    /// Device not found
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to get device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start/play stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// Unsupported sample format
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The backend cannot run at a usable output rate
    #[error("Invalid output sample rate: {0}Hz")]
    InvalidSampleRate(u32),

    /// The mixer is already attached to a backend
    #[error("Mixer is already bound to an audio backend")]
    AlreadyBound,
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
