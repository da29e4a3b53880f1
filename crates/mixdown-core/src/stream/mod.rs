//! Audio input streams
//!
//! Every channel pulls its PCM from an [`AudioInputStream`]: a lazy,
//! non-restartable sequence of interleaved 16-bit frames at the source's own
//! rate. Three variants ship with the mixer:
//!
//! - [`LinearStream`]: a fixed sample block, optionally looping
//! - [`AppendableStream`]: a bounded buffer fed incrementally by a producer
//! - [`DecoderStream`]: compressed audio decoded on demand (Symphonia)
//!
//! Anything else that can produce PCM (a synthesizer, a network source)
//! implements the trait and plays through
//! [`Mixer::play_input_stream`](crate::mixer::Mixer::play_input_stream).

mod appendable;
mod decoder;
mod error;
mod format;
mod linear;

pub use appendable::AppendableStream;
pub use decoder::DecoderStream;
pub use error::StreamError;
pub use format::{RawBuffer, SampleFormat, SoundFlags};
pub use linear::LinearStream;

pub use symphonia::core::io::MediaSource;

use crate::types::Sample;

/// Pull-based source of interleaved PCM frames
pub trait AudioInputStream: Send {
    /// Fill `buffer` with interleaved samples
    ///
    /// Returns the number of samples written, always a whole number of
    /// frames. Fewer than requested means the stream ran dry for now;
    /// check [`end_of_data`](Self::end_of_data) to tell an underrun from
    /// the end.
    fn read(&mut self, buffer: &mut [Sample]) -> usize;

    /// Whether frames are stereo pairs (otherwise mono)
    fn is_stereo(&self) -> bool;

    /// Native sample rate in Hz
    fn rate(&self) -> u32;

    /// True once no more frames will ever be produced
    fn end_of_data(&self) -> bool;

    /// Samples per frame
    fn channels(&self) -> usize {
        if self.is_stereo() {
            2
        } else {
            1
        }
    }
}

impl<S: AudioInputStream + ?Sized> AudioInputStream for Box<S> {
    fn read(&mut self, buffer: &mut [Sample]) -> usize {
        (**self).read(buffer)
    }

    fn is_stereo(&self) -> bool {
        (**self).is_stereo()
    }

    fn rate(&self) -> u32 {
        (**self).rate()
    }

    fn end_of_data(&self) -> bool {
        (**self).end_of_data()
    }
}
