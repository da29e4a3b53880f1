//! Append-based streaming input
//!
//! A producer pushes raw PCM as it becomes available and finally calls
//! [`AppendableStream::finish`]. The bytes live in a bounded SPSC ring
//! buffer (`rtrb`) sized once at creation, so appends never reallocate.
//!
//! Running dry before `finish` is an underrun, not the end of the stream:
//! reads return nothing and the channel keeps its slot until more data
//! arrives.

use super::error::StreamError;
use super::format::{SampleFormat, SoundFlags};
use super::AudioInputStream;
use crate::types::Sample;

pub struct AppendableStream {
    producer: rtrb::Producer<u8>,
    consumer: rtrb::Consumer<u8>,
    format: SampleFormat,
    rate: u32,
    finished: bool,
}

impl AppendableStream {
    /// Create an empty stream holding at most `capacity` bytes of unread data
    pub fn new(rate: u32, flags: SoundFlags, capacity: usize) -> Result<Self, StreamError> {
        if rate == 0 {
            return Err(StreamError::InvalidRate(rate));
        }
        let (producer, consumer) = rtrb::RingBuffer::<u8>::new(capacity);
        Ok(Self {
            producer,
            consumer,
            format: SampleFormat::from_flags(flags),
            rate,
            finished: false,
        })
    }

    /// Append raw PCM in the stream's format
    ///
    /// Fails without writing anything if `data` does not fit in the free
    /// space, or if the stream was already finished.
    pub fn append(&mut self, data: &[u8]) -> Result<(), StreamError> {
        if self.finished {
            return Err(StreamError::Finished);
        }

        let available = self.producer.slots();
        if data.len() > available {
            return Err(StreamError::CapacityExceeded {
                requested: data.len(),
                available,
            });
        }
        if data.is_empty() {
            return Ok(());
        }

        let chunk = self
            .producer
            .write_chunk_uninit(data.len())
            .map_err(|_| StreamError::CapacityExceeded {
                requested: data.len(),
                available,
            })?;
        chunk.fill_from_iter(data.iter().copied());
        Ok(())
    }

    /// Mark that no more data will be appended (idempotent)
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Whole frames currently buffered
    pub fn buffered_frames(&self) -> usize {
        self.consumer.slots() / self.format.bytes_per_frame()
    }

    /// Free space in bytes
    pub fn free_space(&self) -> usize {
        self.producer.slots()
    }
}

impl AudioInputStream for AppendableStream {
    fn read(&mut self, buffer: &mut [Sample]) -> usize {
        let channels = self.format.channels();
        let frames = (buffer.len() / channels).min(self.buffered_frames());
        if frames == 0 {
            return 0;
        }

        let Ok(chunk) = self.consumer.read_chunk(frames * self.format.bytes_per_frame()) else {
            return 0;
        };

        let (first, second) = chunk.as_slices();
        let mut bytes = first.iter().chain(second.iter()).copied();
        let mut written = 0;
        for sample in buffer[..frames * channels].iter_mut() {
            match self.format.decode_from(&mut bytes) {
                Some(value) => {
                    *sample = value;
                    written += 1;
                }
                None => break,
            }
        }
        chunk.commit_all();

        written
    }

    fn is_stereo(&self) -> bool {
        self.format.stereo
    }

    fn rate(&self) -> u32 {
        self.rate
    }

    /// Finished and drained; a trailing partial frame counts as drained
    fn end_of_data(&self) -> bool {
        self.finished && self.buffered_frames() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underrun_is_not_end_of_stream() {
        let mut stream = AppendableStream::new(11025, SoundFlags::UNSIGNED, 16).unwrap();
        stream.append(&[0x80, 0x81]).unwrap();

        let mut buf = [0i16; 8];
        assert_eq!(stream.read(&mut buf), 2);
        assert_eq!(&buf[..2], &[0, 1 << 8]);

        // Drained but not finished
        assert_eq!(stream.read(&mut buf), 0);
        assert!(!stream.end_of_data());

        stream.finish();
        assert!(stream.end_of_data());
    }

    #[test]
    fn test_finish_waits_for_drain() {
        let mut stream = AppendableStream::new(8000, SoundFlags::empty(), 8).unwrap();
        stream.append(&[1, 2, 3]).unwrap();
        stream.finish();
        stream.finish();
        assert!(!stream.end_of_data());

        let mut buf = [0i16; 8];
        assert_eq!(stream.read(&mut buf), 3);
        assert!(stream.end_of_data());
    }

    #[test]
    fn test_append_beyond_capacity_rejected() {
        let mut stream = AppendableStream::new(8000, SoundFlags::empty(), 4).unwrap();
        stream.append(&[0; 3]).unwrap();

        let err = stream.append(&[0; 2]).unwrap_err();
        assert_eq!(
            err,
            StreamError::CapacityExceeded {
                requested: 2,
                available: 1
            }
        );
        // Nothing was written by the failed append
        assert_eq!(stream.free_space(), 1);
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert_eq!(
            AppendableStream::new(0, SoundFlags::empty(), 4).err(),
            Some(StreamError::InvalidRate(0))
        );
    }

    #[test]
    fn test_append_after_finish_rejected() {
        let mut stream = AppendableStream::new(8000, SoundFlags::empty(), 4).unwrap();
        stream.finish();
        assert_eq!(stream.append(&[1]), Err(StreamError::Finished));
    }

    #[test]
    fn test_reads_across_ring_wrap() {
        let flags = SoundFlags::BITS_16 | SoundFlags::LITTLE_ENDIAN;
        let mut stream = AppendableStream::new(8000, flags, 6).unwrap();
        let mut buf = [0i16; 2];

        stream.append(&[1, 0, 2, 0]).unwrap();
        assert_eq!(stream.read(&mut buf), 2);

        // The next 4 bytes wrap around the end of the 6-byte ring
        stream.append(&[3, 0, 4, 0]).unwrap();
        assert_eq!(stream.read(&mut buf), 2);
        assert_eq!(buf, [3, 4]);
    }

    #[test]
    fn test_partial_frame_waits_for_rest() {
        let flags = SoundFlags::BITS_16 | SoundFlags::STEREO;
        let mut stream = AppendableStream::new(8000, flags, 16).unwrap();
        stream.append(&[0, 1, 0]).unwrap();

        let mut buf = [0i16; 4];
        assert_eq!(stream.read(&mut buf), 0);

        stream.append(&[2]).unwrap();
        assert_eq!(stream.read(&mut buf), 2);
        assert_eq!(&buf[..2], &[1, 2]);
    }
}
