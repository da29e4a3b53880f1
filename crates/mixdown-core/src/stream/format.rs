//! Raw PCM sample formats
//!
//! Raw sounds handed to the mixer are plain byte blocks. The format flags
//! say how to read them: sample width, signedness, byte order and channel
//! layout. [`SampleFormat`] is the decoded form used by the streams.

use std::ops::Deref;
use std::sync::Arc;

use bitflags::bitflags;

use crate::types::Sample;

bitflags! {
    /// Format and playback flags for raw sounds
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SoundFlags: u8 {
        /// Samples are unsigned (default: signed)
        const UNSIGNED = 1 << 0;
        /// Samples are 16 bits wide (default: 8 bits)
        const BITS_16 = 1 << 1;
        /// 16-bit samples are little-endian (default: big-endian)
        const LITTLE_ENDIAN = 1 << 2;
        /// Sound is interleaved stereo (default: mono)
        const STEREO = 1 << 3;
        /// Swap left and right on output
        const REVERSE_STEREO = 1 << 4;
        /// Loop the sound (whole buffer, or the given loop region)
        const LOOP = 1 << 5;
    }
}

/// Sample layout derived from [`SoundFlags`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFormat {
    pub bits16: bool,
    pub unsigned: bool,
    pub little_endian: bool,
    pub stereo: bool,
}

impl SampleFormat {
    pub fn from_flags(flags: SoundFlags) -> Self {
        Self {
            bits16: flags.contains(SoundFlags::BITS_16),
            unsigned: flags.contains(SoundFlags::UNSIGNED),
            little_endian: flags.contains(SoundFlags::LITTLE_ENDIAN),
            stereo: flags.contains(SoundFlags::STEREO),
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        if self.stereo {
            2
        } else {
            1
        }
    }

    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        if self.bits16 {
            2
        } else {
            1
        }
    }

    #[inline]
    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() * self.channels()
    }

    /// Decode one sample from exactly `bytes_per_sample()` bytes
    #[inline]
    pub fn decode(&self, bytes: &[u8]) -> Sample {
        if self.bits16 {
            let pair = [bytes[0], bytes[1]];
            let raw = if self.little_endian {
                u16::from_le_bytes(pair)
            } else {
                u16::from_be_bytes(pair)
            };
            if self.unsigned {
                (raw ^ 0x8000) as i16
            } else {
                raw as i16
            }
        } else {
            let byte = if self.unsigned { bytes[0] ^ 0x80 } else { bytes[0] };
            ((byte as i8) as i16) << 8
        }
    }

    /// Decode one sample from a byte iterator
    ///
    /// Used where the bytes come from a ring buffer and may straddle the
    /// wrap-around point.
    #[inline]
    pub fn decode_from(&self, bytes: &mut impl Iterator<Item = u8>) -> Option<Sample> {
        if self.bits16 {
            let first = bytes.next()?;
            let second = bytes.next()?;
            Some(self.decode(&[first, second]))
        } else {
            bytes.next().map(|b| self.decode(&[b]))
        }
    }
}

/// Sample memory for a raw sound
///
/// `Owned` memory belongs to the channel and is released with it (the
/// auto-free case). `Shared` memory stays alive for as long as the caller
/// keeps its own reference.
#[derive(Debug, Clone)]
pub enum RawBuffer {
    Owned(Vec<u8>),
    Shared(Arc<[u8]>),
}

impl RawBuffer {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            RawBuffer::Owned(data) => data,
            RawBuffer::Shared(data) => data,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, RawBuffer::Owned(_))
    }
}

impl Deref for RawBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for RawBuffer {
    fn from(data: Vec<u8>) -> Self {
        RawBuffer::Owned(data)
    }
}

impl From<Arc<[u8]>> for RawBuffer {
    fn from(data: Arc<[u8]>) -> Self {
        RawBuffer::Shared(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_8bit() {
        let signed = SampleFormat::from_flags(SoundFlags::empty());
        assert_eq!(signed.decode(&[0x7f]), 0x7f00);
        assert_eq!(signed.decode(&[0x80]), i16::MIN);

        let unsigned = SampleFormat::from_flags(SoundFlags::UNSIGNED);
        assert_eq!(unsigned.decode(&[0x80]), 0);
        assert_eq!(unsigned.decode(&[0x00]), i16::MIN);
        assert_eq!(unsigned.decode(&[0xff]), 0x7f00);
    }

    #[test]
    fn test_decode_16bit_byte_order() {
        let be = SampleFormat::from_flags(SoundFlags::BITS_16);
        assert_eq!(be.decode(&[0x12, 0x34]), 0x1234);

        let le = SampleFormat::from_flags(SoundFlags::BITS_16 | SoundFlags::LITTLE_ENDIAN);
        assert_eq!(le.decode(&[0x34, 0x12]), 0x1234);

        let unsigned = SampleFormat::from_flags(SoundFlags::BITS_16 | SoundFlags::UNSIGNED);
        assert_eq!(unsigned.decode(&[0x80, 0x00]), 0);
    }

    #[test]
    fn test_frame_sizes() {
        let format = SampleFormat::from_flags(SoundFlags::BITS_16 | SoundFlags::STEREO);
        assert_eq!(format.channels(), 2);
        assert_eq!(format.bytes_per_frame(), 4);
        assert_eq!(SampleFormat::from_flags(SoundFlags::empty()).bytes_per_frame(), 1);
    }

    #[test]
    fn test_decode_from_iterator() {
        let format = SampleFormat::from_flags(SoundFlags::BITS_16);
        let mut bytes = [0x00u8, 0x10, 0xff].into_iter();
        assert_eq!(format.decode_from(&mut bytes), Some(0x0010));
        assert_eq!(format.decode_from(&mut bytes), None);
    }

    #[test]
    fn test_raw_buffer_ownership() {
        let owned: RawBuffer = vec![1u8, 2, 3].into();
        assert!(owned.is_owned());

        let shared: Arc<[u8]> = Arc::from(vec![4u8, 5]);
        let buffer: RawBuffer = shared.clone().into();
        assert!(!buffer.is_owned());
        assert_eq!(&*buffer, &[4, 5]);
        assert_eq!(Arc::strong_count(&shared), 2);
    }
}
