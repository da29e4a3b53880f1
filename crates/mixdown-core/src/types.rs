//! Common types for Mixdown
//!
//! This module contains the fundamental audio types shared by the rate
//! converters, input streams and the mixer: the output sample type, the
//! interleaved stereo frame, and the fixed limits of the mixer.

/// Number of channel slots in the mixer
///
/// The table is never grown; a play request when every slot is taken fails
/// with [`crate::mixer::MixerError::NoFreeSlot`].
pub const NUM_CHANNELS: usize = 16;

/// Maximum value for the global and music volumes
pub const MAX_MIXER_VOLUME: i32 = 256;

/// Maximum value for a per-channel volume
pub const MAX_CHANNEL_VOLUME: u8 = 255;

/// Pan limits (full left / full right)
pub const PAN_LEFT: i8 = -127;
pub const PAN_RIGHT: i8 = 127;

/// Output sample type (signed 16-bit PCM)
pub type Sample = i16;

/// A single stereo output frame (left and right channels)
///
/// Uses `#[repr(C)]` to ensure predictable memory layout: [left, right].
/// This enables zero-copy conversion between `&[StereoFrame]`, `&[i16]`
/// (interleaved format) and the raw byte buffers some backends hand us.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoFrame {
    pub left: Sample,
    pub right: Sample,
}

impl StereoFrame {
    /// Size of one frame in bytes (two 16-bit samples)
    pub const BYTES: usize = std::mem::size_of::<Self>();

    /// Create a new stereo frame
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    /// Create a silent stereo frame
    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Create a mono frame (same value in both channels)
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }

    /// Add a contribution to both sides, saturating at the 16-bit range
    #[inline]
    pub fn mix_in(&mut self, left: i32, right: i32) {
        self.left = clamped_add(self.left, left);
        self.right = clamped_add(self.right, right);
    }

    /// Get the peak amplitude (max of abs(left), abs(right))
    #[inline]
    pub fn peak(&self) -> u16 {
        self.left.unsigned_abs().max(self.right.unsigned_abs())
    }
}

/// Saturating accumulate of a 32-bit contribution into a 16-bit sample
#[inline]
pub fn clamped_add(acc: Sample, value: i32) -> Sample {
    (acc as i32 + value).clamp(Sample::MIN as i32, Sample::MAX as i32) as Sample
}

/// Zero a frame buffer in place
#[inline]
pub fn silence(frames: &mut [StereoFrame]) {
    frames.fill(StereoFrame::silence());
}

/// View a frame buffer as interleaved samples [L, R, L, R, ...]
#[inline]
pub fn as_interleaved(frames: &[StereoFrame]) -> &[Sample] {
    bytemuck::cast_slice(frames)
}
