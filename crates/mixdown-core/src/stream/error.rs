//! Input stream error types

use thiserror::Error;

/// Errors raised while building or feeding an audio input stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Append would overflow the stream's fixed capacity
    #[error("Stream capacity exceeded: tried to append {requested} bytes, {available} available")]
    CapacityExceeded { requested: usize, available: usize },

    /// Append after the producer declared the stream finished
    #[error("Stream already finished")]
    Finished,

    /// Loop region outside the buffer, empty, or not frame aligned
    #[error("Invalid loop region {start}..{end} for a {len} byte buffer")]
    InvalidLoop { start: usize, end: usize, len: usize },

    /// A source rate of 0 Hz can never be converted to the output rate
    #[error("Invalid sample rate: {0}Hz")]
    InvalidRate(u32),

    /// Initial data larger than the declared buffer size
    #[error("Initial data ({len} bytes) exceeds stream buffer size ({capacity} bytes)")]
    InitialDataTooLarge { len: usize, capacity: usize },

    /// The decoder reported an error while opening the source
    #[error("Decoder error: {0}")]
    Decoder(String),

    /// The container has no decodable audio track
    #[error("No audio track found")]
    NoAudioTrack,

    /// The source reports a channel layout we cannot mix
    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(usize),
}
