//! Rate conversion
//!
//! A rate converter pulls frames from one input stream at the stream's
//! native rate and adds them, gain-scaled, into the mixer's stereo output at
//! the output rate. Mono sources are spread to both sides; stereo sources
//! can be reversed.
//!
//! ## Converters
//!
//! - [`CopyRateConverter`]: input rate == output rate, no interpolation
//! - [`LinearRateConverter`]: any other ratio, 16.16 fixed-point linear
//!   interpolation between consecutive input frames
//!
//! Both work in integer arithmetic and saturate at the 16-bit sample range.
//! Scratch buffers are allocated once at construction; `flow` itself never
//! allocates, so it is safe to call from the audio callback.

mod copy;
mod linear;

pub use copy::CopyRateConverter;
pub use linear::LinearRateConverter;

use crate::stream::AudioInputStream;
use crate::types::{Sample, StereoFrame, MAX_MIXER_VOLUME, PAN_LEFT, PAN_RIGHT};

/// Per-side gain, `0..=256` where 256 is unity
pub type Volume = u16;

/// Input frames pulled from a stream per read
pub(crate) const CHUNK_FRAMES: usize = 512;

/// Converts one stream to the output rate while mixing it into a buffer
pub trait RateConverter: Send {
    /// Add up to `out.len()` frames from `input` into `out`
    ///
    /// Returns the number of output frames produced. Fewer than
    /// `out.len()` means the input ran dry (underrun or end of stream).
    /// The stream is advanced by exactly the frames consumed.
    fn flow(
        &mut self,
        input: &mut dyn AudioInputStream,
        out: &mut [StereoFrame],
        vol_l: Volume,
        vol_r: Volume,
    ) -> usize;
}

/// Build the converter for a source of `in_rate` Hz feeding `out_rate` Hz
pub fn make_rate_converter(
    in_rate: u32,
    out_rate: u32,
    stereo: bool,
    reverse_stereo: bool,
) -> Box<dyn RateConverter> {
    if in_rate == out_rate {
        Box::new(CopyRateConverter::new(stereo, reverse_stereo))
    } else {
        Box::new(LinearRateConverter::new(in_rate, out_rate, stereo, reverse_stereo))
    }
}

/// Per-side gains from a channel's pan and volume and the applicable
/// global (or music) volume
///
/// `(127 - pan) * volume * global / (255 * 254)` on the left and
/// `(127 + pan) * ...` on the right, so a centred full-volume channel
/// at full global volume gets 128 on each side and a hard-panned one
/// gets 256 on one side.
pub fn pan_gains(volume: u8, pan: i8, global_volume: i32) -> (Volume, Volume) {
    let pan = pan.clamp(PAN_LEFT, PAN_RIGHT) as i32;
    let vol = volume as i32 * global_volume.clamp(0, MAX_MIXER_VOLUME);
    let left = (127 - pan) * vol / (255 * 254);
    let right = (127 + pan) * vol / (255 * 254);
    (left as Volume, right as Volume)
}

/// Scale one sample by a `0..=256` gain
#[inline]
pub(crate) fn scale(sample: Sample, volume: Volume) -> i32 {
    sample as i32 * volume as i32 / MAX_MIXER_VOLUME
}

/// Split one input frame into (left, right), honouring mono and reversal
#[inline]
pub(crate) fn frame_sides(frame: &[Sample], stereo: bool, reverse: bool) -> (Sample, Sample) {
    if !stereo {
        (frame[0], frame[0])
    } else if reverse {
        (frame[1], frame[0])
    } else {
        (frame[0], frame[1])
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::stream::AudioInputStream;
    use crate::types::Sample;

    /// In-memory stream that also counts how many samples were pulled
    pub struct VecStream {
        pub samples: Vec<Sample>,
        pub pos: usize,
        pub stereo: bool,
        pub rate: u32,
    }

    impl VecStream {
        pub fn mono(samples: Vec<Sample>, rate: u32) -> Self {
            Self {
                samples,
                pos: 0,
                stereo: false,
                rate,
            }
        }

        pub fn stereo(samples: Vec<Sample>, rate: u32) -> Self {
            Self {
                samples,
                pos: 0,
                stereo: true,
                rate,
            }
        }
    }

    impl AudioInputStream for VecStream {
        fn read(&mut self, buffer: &mut [Sample]) -> usize {
            let channels = self.channels();
            let count = (buffer.len() - buffer.len() % channels).min(self.samples.len() - self.pos);
            buffer[..count].copy_from_slice(&self.samples[self.pos..self.pos + count]);
            self.pos += count;
            count
        }

        fn is_stereo(&self) -> bool {
            self.stereo
        }

        fn rate(&self) -> u32 {
            self.rate
        }

        fn end_of_data(&self) -> bool {
            self.pos >= self.samples.len()
        }
    }
}
