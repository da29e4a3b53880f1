//! One playing sound: its stream, its rate converter and its controls

use crate::rate::{make_rate_converter, pan_gains, RateConverter};
use crate::stream::{AppendableStream, AudioInputStream, LinearStream};
use crate::types::{StereoFrame, PAN_LEFT};

use super::error::{MixerError, MixerResult};
use super::handle::SoundHandle;

/// Where a channel's PCM comes from
pub(crate) enum ChannelSource {
    /// Fixed sample block, possibly looping
    Raw(LinearStream),
    /// Appendable stream fed by the caller
    Stream(AppendableStream),
    /// Any other stream (decoders, synthesizers)
    Generic(Box<dyn AudioInputStream>),
}

impl ChannelSource {
    fn input(&mut self) -> &mut dyn AudioInputStream {
        match self {
            ChannelSource::Raw(stream) => stream,
            ChannelSource::Stream(stream) => stream,
            ChannelSource::Generic(stream) => stream.as_mut(),
        }
    }

    fn end_of_data(&self) -> bool {
        match self {
            ChannelSource::Raw(stream) => stream.end_of_data(),
            ChannelSource::Stream(stream) => stream.end_of_data(),
            ChannelSource::Generic(stream) => stream.end_of_data(),
        }
    }

    fn rate(&self) -> u32 {
        match self {
            ChannelSource::Raw(stream) => stream.rate(),
            ChannelSource::Stream(stream) => stream.rate(),
            ChannelSource::Generic(stream) => stream.rate(),
        }
    }

    fn is_stereo(&self) -> bool {
        match self {
            ChannelSource::Raw(stream) => stream.is_stereo(),
            ChannelSource::Stream(stream) => stream.is_stereo(),
            ChannelSource::Generic(stream) => stream.is_stereo(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MixStatus {
    Playing,
    Finished,
}

/// Construction parameters shared by every channel kind
pub(crate) struct ChannelOptions {
    pub is_music: bool,
    pub volume: u8,
    pub pan: i8,
    pub id: Option<i32>,
    pub reverse_stereo: bool,
}

pub(crate) struct Channel {
    source: ChannelSource,
    converter: Box<dyn RateConverter>,
    handle: SoundHandle,
    id: Option<i32>,
    is_music: bool,
    volume: u8,
    pan: i8,
    paused: bool,
}

impl Channel {
    pub fn new(
        source: ChannelSource,
        output_rate: u32,
        handle: SoundHandle,
        options: ChannelOptions,
    ) -> Self {
        let converter = make_rate_converter(
            source.rate(),
            output_rate,
            source.is_stereo(),
            options.reverse_stereo,
        );
        Self {
            source,
            converter,
            handle,
            id: options.id,
            is_music: options.is_music,
            volume: options.volume,
            pan: options.pan.max(PAN_LEFT),
            paused: false,
        }
    }

    /// Add this channel's next `out.len()` frames into `out`
    ///
    /// `global_volume` is the mixer's sfx or music volume, whichever
    /// applies. Returns `Finished` once the stream has nothing left, either
    /// before mixing or after this pass drained it.
    pub fn mix(&mut self, out: &mut [StereoFrame], global_volume: i32) -> MixStatus {
        if self.source.end_of_data() {
            return MixStatus::Finished;
        }

        let (vol_l, vol_r) = pan_gains(self.volume, self.pan, global_volume);
        self.converter.flow(self.source.input(), out, vol_l, vol_r);

        if self.source.end_of_data() {
            MixStatus::Finished
        } else {
            MixStatus::Playing
        }
    }

    pub fn append(&mut self, index: usize, data: &[u8]) -> MixerResult<()> {
        match &mut self.source {
            ChannelSource::Stream(stream) => Ok(stream.append(data)?),
            _ => Err(MixerError::NotAStream(index)),
        }
    }

    pub fn finish(&mut self, index: usize) -> MixerResult<()> {
        match &mut self.source {
            ChannelSource::Stream(stream) => {
                stream.finish();
                Ok(())
            }
            _ => Err(MixerError::NotAStream(index)),
        }
    }

    pub fn handle(&self) -> &SoundHandle {
        &self.handle
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    pub fn is_music(&self) -> bool {
        self.is_music
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume;
    }

    pub fn set_pan(&mut self, pan: i8) {
        self.pan = pan.max(PAN_LEFT);
    }

    pub fn pause(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.handle.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{RawBuffer, SoundFlags};

    fn raw_channel(samples: &[i8], rate: u32, output_rate: u32) -> Channel {
        let bytes: Vec<u8> = samples.iter().map(|&s| s as u8).collect();
        let stream =
            LinearStream::new(RawBuffer::from(bytes), rate, SoundFlags::empty(), None).unwrap();
        Channel::new(
            ChannelSource::Raw(stream),
            output_rate,
            SoundHandle::new(0),
            ChannelOptions {
                is_music: false,
                volume: 255,
                pan: 0,
                id: None,
                reverse_stereo: false,
            },
        )
    }

    #[test]
    fn test_finishes_in_the_pass_that_drains_it() {
        let mut channel = raw_channel(&[10; 8], 8000, 8000);
        let mut out = [StereoFrame::silence(); 4];
        assert_eq!(channel.mix(&mut out, 256), MixStatus::Playing);
        assert_eq!(channel.mix(&mut out, 256), MixStatus::Finished);
    }

    #[test]
    fn test_short_sound_finishes_with_partial_output() {
        let mut channel = raw_channel(&[10; 3], 8000, 8000);
        let mut out = [StereoFrame::silence(); 4];
        assert_eq!(channel.mix(&mut out, 256), MixStatus::Finished);
        // 8-bit 10 widens to 2560, centre pan halves it
        assert_eq!(out[2], StereoFrame::mono(1280));
        assert_eq!(out[3], StereoFrame::silence());
    }

    #[test]
    fn test_appending_to_raw_channel_is_rejected() {
        let mut channel = raw_channel(&[0; 4], 8000, 8000);
        assert_eq!(channel.append(7, &[1, 2]), Err(MixerError::NotAStream(7)));
        assert_eq!(channel.finish(7), Err(MixerError::NotAStream(7)));
    }

    #[test]
    fn test_drop_invalidates_handle() {
        let channel = raw_channel(&[0; 4], 8000, 8000);
        let handle = channel.handle().clone();
        assert!(handle.is_alive());
        drop(channel);
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_pan_minimum_is_clamped() {
        let mut channel = raw_channel(&[0; 4], 8000, 8000);
        channel.set_pan(i8::MIN);
        assert_eq!(channel.pan, PAN_LEFT);
    }
}
