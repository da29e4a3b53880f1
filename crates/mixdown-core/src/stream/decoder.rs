//! Decoder-backed input stream (Symphonia)
//!
//! Wraps any container/codec Symphonia understands (MP3, Ogg Vorbis, FLAC,
//! WAV) behind the same pull contract as the raw streams. Packets are
//! decoded lazily, one at a time, as the mixer asks for frames.
//!
//! Sources with more than two channels are reduced to their first two.
//!
//! Conversion buffers are sized at open from the codec's largest packet, so
//! decoding during a mix pass does not allocate unless a packet exceeds the
//! size the codec advertised.

use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::error::StreamError;
use super::AudioInputStream;
use crate::types::Sample;

/// Packet size assumed when the codec does not report one
const DEFAULT_PACKET_FRAMES: usize = 4096;

pub struct DecoderStream {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    rate: u32,
    /// Channel count of the source
    source_channels: usize,
    /// Channel count we hand out (1 or 2)
    channels: usize,
    /// Decoded, channel-reduced samples not yet read
    pending: Vec<Sample>,
    pending_pos: usize,
    /// Reused conversion buffer and its capacity in samples
    sample_buf: Option<(SampleBuffer<Sample>, usize)>,
    finished: bool,
}

impl DecoderStream {
    /// Probe `source` and prepare to decode its first audio track
    ///
    /// `extension` (e.g. "mp3", "ogg") helps the probe pick a format.
    pub fn open(
        source: Box<dyn MediaSource>,
        extension: Option<&str>,
    ) -> Result<Self, StreamError> {
        let mss = MediaSourceStream::new(source, Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| StreamError::Decoder(e.to_string()))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(StreamError::NoAudioTrack)?;

        let track_id = track.id;

        let rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| StreamError::Decoder("Unknown sample rate".to_string()))?;

        if rate == 0 {
            return Err(StreamError::InvalidRate(rate));
        }

        let source_channels = track
            .codec_params
            .channels
            .map(|c| c.count())
            .unwrap_or(2);
        if source_channels == 0 {
            return Err(StreamError::UnsupportedChannels(source_channels));
        }

        let max_frames = track
            .codec_params
            .max_frames_per_packet
            .map_or(DEFAULT_PACKET_FRAMES, |frames| frames as usize);
        let sample_buf = track.codec_params.channels.map(|layout| {
            let buf = SampleBuffer::new(max_frames as u64, SignalSpec::new(rate, layout));
            (buf, max_frames * source_channels)
        });

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| StreamError::Decoder(e.to_string()))?;

        log::debug!(
            "DecoderStream: opened track {} ({}Hz, {} channels)",
            track_id,
            rate,
            source_channels
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            rate,
            source_channels,
            channels: source_channels.min(2),
            pending: Vec::with_capacity(max_frames * 2),
            pending_pos: 0,
            sample_buf,
            finished: false,
        })
    }

    /// Decode the next packet of our track into `pending`
    ///
    /// Sets `finished` when the source runs out or fails.
    fn decode_next(&mut self) {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.finished = true;
                    return;
                }
                Err(e) => {
                    log::warn!("DecoderStream: error reading packet: {}", e);
                    self.finished = true;
                    return;
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("DecoderStream: skipping corrupt packet: {}", e);
                    continue;
                }
                Err(e) => {
                    log::warn!("DecoderStream: decoder failed: {}", e);
                    self.finished = true;
                    return;
                }
            };

            let spec = *decoded.spec();
            let samples = decoded.frames() * spec.channels.count();
            let needs_buffer = self
                .sample_buf
                .as_ref()
                .map_or(true, |(_, capacity)| *capacity < samples);
            if needs_buffer {
                log::debug!("DecoderStream: growing sample buffer to {} samples", samples);
                let frames = decoded.capacity().max(decoded.frames());
                let buf = SampleBuffer::new(frames as u64, spec);
                self.sample_buf = Some((buf, frames * spec.channels.count()));
            }

            let Some((buf, _)) = self.sample_buf.as_mut() else {
                return;
            };
            buf.copy_interleaved_ref(decoded);

            self.pending.clear();
            self.pending_pos = 0;
            let samples = buf.samples();
            if self.source_channels <= 2 {
                self.pending.extend_from_slice(samples);
            } else {
                for frame in samples.chunks_exact(self.source_channels) {
                    self.pending.extend_from_slice(&frame[..2]);
                }
            }

            if !self.pending.is_empty() {
                return;
            }
        }
    }
}

impl AudioInputStream for DecoderStream {
    fn read(&mut self, buffer: &mut [Sample]) -> usize {
        let wanted = buffer.len() - buffer.len() % self.channels;
        let mut written = 0;

        while written < wanted {
            if self.pending_pos >= self.pending.len() {
                if self.finished {
                    break;
                }
                self.decode_next();
                continue;
            }

            let count = (self.pending.len() - self.pending_pos).min(wanted - written);
            buffer[written..written + count]
                .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + count]);
            self.pending_pos += count;
            written += count;
        }

        written
    }

    fn is_stereo(&self) -> bool {
        self.channels == 2
    }

    fn rate(&self) -> u32 {
        self.rate
    }

    fn end_of_data(&self) -> bool {
        self.finished && self.pending_pos >= self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn wav_bytes(channels: u16, rate: u32, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decodes_wav_to_end() {
        let samples: Vec<i16> = (0..1000).map(|i| (i * 7) as i16).collect();
        let bytes = wav_bytes(1, 22050, &samples);

        let mut stream = DecoderStream::open(Box::new(Cursor::new(bytes)), Some("wav")).unwrap();
        assert_eq!(stream.rate(), 22050);
        assert!(!stream.is_stereo());

        let mut out = Vec::new();
        let mut buf = [0i16; 256];
        loop {
            let n = stream.read(&mut buf);
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, samples);
        assert!(stream.end_of_data());
    }

    #[test]
    fn test_stereo_source_stays_interleaved() {
        let samples: Vec<i16> = (0..200).map(|i| if i % 2 == 0 { i } else { -i }).collect();
        let bytes = wav_bytes(2, 44100, &samples);

        let mut stream = DecoderStream::open(Box::new(Cursor::new(bytes)), Some("wav")).unwrap();
        assert!(stream.is_stereo());
        assert_eq!(stream.rate(), 44100);

        // Odd request: only whole frames are handed out
        let mut buf = [0i16; 7];
        assert_eq!(stream.read(&mut buf), 6);
        assert_eq!(&buf[..6], &[0, -1, 2, -3, 4, -5]);
        assert!(!stream.end_of_data());
    }

    #[test]
    fn test_buffers_sized_at_open() {
        let samples: Vec<i16> = (0..5000).map(|i| (i % 100) as i16).collect();
        let bytes = wav_bytes(1, 22050, &samples);

        let mut stream = DecoderStream::open(Box::new(Cursor::new(bytes)), Some("wav")).unwrap();
        let pending_capacity = stream.pending.capacity();
        let sample_capacity = stream.sample_buf.as_ref().map(|(_, capacity)| *capacity);
        assert!(sample_capacity.is_some(), "conversion buffer exists before decoding");

        let mut buf = [0i16; 512];
        while stream.read(&mut buf) > 0 {}

        assert_eq!(stream.pending.capacity(), pending_capacity);
        assert_eq!(
            stream.sample_buf.as_ref().map(|(_, capacity)| *capacity),
            sample_capacity
        );
    }

    #[test]
    fn test_garbage_input_rejected() {
        let result = DecoderStream::open(Box::new(Cursor::new(vec![0u8; 64])), None);
        assert!(result.is_err());
    }
}
