//! Mixdown Core - real-time software audio mixer
//!
//! A fixed bank of sound channels, each resampled, panned and
//! volume-scaled, summed into one interleaved 16-bit stereo buffer on
//! demand from an audio backend.
//!
//! - [`mixer`]: the mixer, its channels and sound handles
//! - [`stream`]: PCM input streams (raw buffers, appendable, decoded)
//! - [`rate`]: rate converters from a stream's rate to the output rate
//! - [`audio`]: output backends (CPAL, offline)
//! - [`config`]: YAML configuration and settings

pub mod audio;
pub mod config;
pub mod mixer;
pub mod rate;
pub mod stream;
pub mod types;

pub use mixer::{Mixer, MixerBinding, MixerError, PlayParams, SoundHandle};
pub use stream::{AudioInputStream, RawBuffer, SoundFlags};
pub use types::*;
