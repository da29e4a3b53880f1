//! Fixed-buffer input stream
//!
//! Plays a raw sample block from start to end, optionally looping. With a
//! loop region the sound plays from the start up to `loop_end`, then keeps
//! jumping back to `loop_start`; bytes past `loop_end` are never heard.

use std::ops::Range;

use super::error::StreamError;
use super::format::{RawBuffer, SampleFormat, SoundFlags};
use super::AudioInputStream;
use crate::types::Sample;

pub struct LinearStream {
    data: RawBuffer,
    format: SampleFormat,
    rate: u32,
    /// Read cursor in bytes
    pos: usize,
    /// End of the playable region in bytes (frame aligned)
    end: usize,
    /// Where the cursor jumps when it reaches `end`; `None` for one-shot sounds
    loop_start: Option<usize>,
}

impl LinearStream {
    /// Create a stream over `data`
    ///
    /// `loop_range` is in bytes and only used when `flags` contains
    /// [`SoundFlags::LOOP`]; without it the whole buffer loops.
    pub fn new(
        data: RawBuffer,
        rate: u32,
        flags: SoundFlags,
        loop_range: Option<Range<usize>>,
    ) -> Result<Self, StreamError> {
        if rate == 0 {
            return Err(StreamError::InvalidRate(rate));
        }
        let format = SampleFormat::from_flags(flags);
        let frame = format.bytes_per_frame();
        let len = data.len();
        // Trailing partial frame is ignored
        let aligned_len = len - len % frame;

        let (end, loop_start) = if flags.contains(SoundFlags::LOOP) {
            match loop_range {
                Some(range) => {
                    let invalid = range.start >= range.end
                        || range.end > len
                        || range.start % frame != 0
                        || range.end % frame != 0;
                    if invalid {
                        return Err(StreamError::InvalidLoop {
                            start: range.start,
                            end: range.end,
                            len,
                        });
                    }
                    (range.end, Some(range.start))
                }
                // Nothing to loop over in an empty buffer
                None if aligned_len == 0 => (0, None),
                None => (aligned_len, Some(0)),
            }
        } else {
            (aligned_len, None)
        };

        Ok(Self {
            data,
            format,
            rate,
            pos: 0,
            end,
            loop_start,
        })
    }

    /// Whether this stream restarts instead of ending
    pub fn is_looping(&self) -> bool {
        self.loop_start.is_some()
    }

    /// Frames left before the end (or the next loop jump)
    pub fn remaining_frames(&self) -> usize {
        (self.end - self.pos) / self.format.bytes_per_frame()
    }
}

impl AudioInputStream for LinearStream {
    fn read(&mut self, buffer: &mut [Sample]) -> usize {
        let channels = self.format.channels();
        let frame_bytes = self.format.bytes_per_frame();
        let sample_bytes = self.format.bytes_per_sample();
        let wanted_frames = buffer.len() / channels;

        let mut frames_done = 0;
        while frames_done < wanted_frames {
            if self.pos >= self.end {
                match self.loop_start {
                    Some(start) => self.pos = start,
                    None => break,
                }
            }

            let frames = ((self.end - self.pos) / frame_bytes).min(wanted_frames - frames_done);
            let bytes = &self.data[self.pos..self.pos + frames * frame_bytes];
            let out = &mut buffer[frames_done * channels..(frames_done + frames) * channels];
            for (sample, raw) in out.iter_mut().zip(bytes.chunks_exact(sample_bytes)) {
                *sample = self.format.decode(raw);
            }

            self.pos += frames * frame_bytes;
            frames_done += frames;
        }

        frames_done * channels
    }

    fn is_stereo(&self) -> bool {
        self.format.stereo
    }

    fn rate(&self) -> u32 {
        self.rate
    }

    fn end_of_data(&self) -> bool {
        self.loop_start.is_none() && self.pos >= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono8(len: usize) -> RawBuffer {
        RawBuffer::Owned((0..len).map(|i| i as u8).collect())
    }

    #[test]
    fn test_one_shot_ends_exactly_at_buffer_end() {
        let mut stream = LinearStream::new(mono8(10), 11025, SoundFlags::empty(), None).unwrap();
        let mut buf = [0i16; 9];

        assert_eq!(stream.read(&mut buf), 9);
        assert!(!stream.end_of_data(), "one frame left after S-1 frames");

        let mut last = [0i16; 4];
        assert_eq!(stream.read(&mut last), 1);
        assert_eq!(last[0], 9 << 8);
        assert!(stream.end_of_data());

        // End of stream is permanent
        assert_eq!(stream.read(&mut last), 0);
        assert!(stream.end_of_data());
    }

    #[test]
    fn test_whole_buffer_loop_never_ends() {
        let mut stream = LinearStream::new(mono8(4), 8000, SoundFlags::LOOP, Some(0..4)).unwrap();
        let mut buf = [0i16; 10];
        for _ in 0..100 {
            assert_eq!(stream.read(&mut buf), 10);
            assert!(!stream.end_of_data());
        }
        assert!(stream.is_looping());
    }

    #[test]
    fn test_loop_region_plays_intro_once() {
        let mut stream = LinearStream::new(mono8(6), 8000, SoundFlags::LOOP, Some(2..4)).unwrap();
        let mut buf = [0i16; 8];
        stream.read(&mut buf);
        let bytes: Vec<i16> = buf.iter().map(|s| s >> 8).collect();
        assert_eq!(bytes, vec![0, 1, 2, 3, 2, 3, 2, 3]);
    }

    #[test]
    fn test_loop_flag_without_range_loops_whole_buffer() {
        let mut stream = LinearStream::new(mono8(3), 8000, SoundFlags::LOOP, None).unwrap();
        let mut buf = [0i16; 7];
        assert_eq!(stream.read(&mut buf), 7);
        assert_eq!(buf[3] >> 8, 0);
        assert!(!stream.end_of_data());
    }

    #[test]
    fn test_invalid_loop_rejected() {
        let flags = SoundFlags::LOOP | SoundFlags::BITS_16;
        assert!(matches!(
            LinearStream::new(mono8(8), 8000, flags, Some(4..2)),
            Err(StreamError::InvalidLoop { .. })
        ));
        assert!(matches!(
            LinearStream::new(mono8(8), 8000, flags, Some(0..10)),
            Err(StreamError::InvalidLoop { .. })
        ));
        // Odd offsets split a 16-bit sample
        assert!(matches!(
            LinearStream::new(mono8(8), 8000, flags, Some(1..5)),
            Err(StreamError::InvalidLoop { .. })
        ));
    }

    #[test]
    fn test_loop_range_ignored_without_loop_flag() {
        let stream = LinearStream::new(mono8(8), 8000, SoundFlags::empty(), Some(4..2)).unwrap();
        assert!(!stream.is_looping());
        assert_eq!(stream.remaining_frames(), 8);
    }

    #[test]
    fn test_stereo_16bit_reads_whole_frames() {
        let data: Vec<u8> = vec![0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0xff];
        let flags = SoundFlags::BITS_16 | SoundFlags::STEREO;
        let mut stream = LinearStream::new(data.into(), 22050, flags, None).unwrap();
        assert!(stream.is_stereo());
        assert_eq!(stream.remaining_frames(), 2);

        // Odd buffer length: only whole frames are read
        let mut buf = [0i16; 3];
        assert_eq!(stream.read(&mut buf), 2);
        assert_eq!(&buf[..2], &[1, 2]);

        let mut rest = [0i16; 4];
        assert_eq!(stream.read(&mut rest), 2);
        assert_eq!(&rest[..2], &[3, 4]);
        assert!(stream.end_of_data());
    }

    #[test]
    fn test_zero_rate_rejected() {
        let result = LinearStream::new(mono8(4), 0, SoundFlags::empty(), None);
        assert_eq!(result.err(), Some(StreamError::InvalidRate(0)));
    }

    #[test]
    fn test_empty_buffer_is_immediately_finished() {
        let empty = RawBuffer::Owned(Vec::new());
        let stream = LinearStream::new(empty, 8000, SoundFlags::LOOP, None).unwrap();
        assert!(stream.end_of_data());
    }
}
