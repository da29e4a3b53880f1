//! CPAL audio backend
//!
//! Opens one output device and, once the mixer installs its callback, builds
//! and starts a CPAL output stream that pulls mixed frames through it.
//!
//! ```text
//! ┌──────────────────┐   control calls   ┌─────────────────────┐
//! │ Application      │──────────────────►│ Mixer (one mutex)   │
//! └──────────────────┘                   └──────────▲──────────┘
//!                                                   │ mix()
//!                                        ┌──────────┴──────────┐
//!                                        │ CPAL stream thread  │
//!                                        │ frames -> f32/i16   │
//!                                        └─────────────────────┘
//! ```
//!
//! The stream converts the mixer's 16-bit stereo frames to the device's
//! sample format and channel count. Device channels past the first two get
//! silence; a mono device gets the average of both sides.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    BufferSize as CpalBufferSize, FromSample, SampleFormat, SizedSample, Stream, StreamConfig,
};

use super::backend::{AudioBackend, MixCallback};
use super::config::{AudioConfig, BufferSize, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE};
use super::device::{find_device_by_id, get_cpal_default_device};
use super::error::{AudioError, AudioResult};
use crate::types::{Sample, StereoFrame};

/// Output formats we can convert frames to, in order of preference
const SUPPORTED_FORMATS: [SampleFormat; 3] =
    [SampleFormat::F32, SampleFormat::I16, SampleFormat::U16];

pub struct CpalBackend {
    device: cpal::Device,
    device_name: String,
    stream_config: StreamConfig,
    sample_format: SampleFormat,
    buffer_size: u32,
    /// Running stream while a callback is installed
    stream: Option<Stream>,
}

impl CpalBackend {
    /// Open the configured (or default) output device
    ///
    /// The stream is not started until the mixer installs its callback.
    pub fn open(config: &AudioConfig) -> AudioResult<Self> {
        let device = match &config.device {
            Some(id) => find_device_by_id(id)?,
            None => get_cpal_default_device()?,
        };

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using audio device: {}", device_name);

        let (supported_config, buffer_size) = get_output_config(&device, config)?;
        let sample_format = supported_config.sample_format();
        let stream_config = StreamConfig {
            channels: supported_config.channels(),
            sample_rate: supported_config.sample_rate(),
            buffer_size: CpalBufferSize::Fixed(buffer_size),
        };

        log::info!(
            "Audio config: {} channels, {}Hz, {:?}, {} frames (~{:.1}ms latency)",
            stream_config.channels,
            stream_config.sample_rate.0,
            sample_format,
            buffer_size,
            (buffer_size as f32 / stream_config.sample_rate.0 as f32) * 1000.0
        );

        Ok(Self {
            device,
            device_name,
            stream_config,
            sample_format,
            buffer_size,
            stream: None,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Buffer size in frames, as requested from the device
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// Output latency in milliseconds (one buffer)
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.stream_config.sample_rate.0 as f32) * 1000.0
    }
}

impl AudioBackend for CpalBackend {
    fn sample_rate(&self) -> u32 {
        self.stream_config.sample_rate.0
    }

    fn set_mix_callback(&mut self, callback: MixCallback) -> AudioResult<()> {
        self.clear_mix_callback();

        let (device, config) = (&self.device, &self.stream_config);
        let stream = match self.sample_format {
            SampleFormat::F32 => build_output_stream::<f32>(device, config, callback)?,
            SampleFormat::I16 => build_output_stream::<i16>(device, config, callback)?,
            SampleFormat::U16 => build_output_stream::<u16>(device, config, callback)?,
            other => return Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
        };

        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        log::info!("Audio stream started on {}", self.device_name);
        self.stream = Some(stream);
        Ok(())
    }

    fn clear_mix_callback(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::warn!("Failed to pause audio stream: {}", e);
            }
            // Dropping the stream joins the callback thread
            drop(stream);
            log::info!("Audio stream stopped");
        }
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        self.clear_mix_callback();
    }
}

/// Pick the device configuration closest to what `config` asks for
///
/// Returns (SupportedStreamConfig, buffer_size_in_frames)
fn get_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
) -> AudioResult<(cpal::SupportedStreamConfig, u32)> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .filter(|c| SUPPORTED_FORMATS.contains(&c.sample_format()))
        .collect();

    if supported_configs.is_empty() {
        return Err(AudioError::UnsupportedFormat(
            "Device offers no f32, i16 or u16 output".to_string(),
        ));
    }

    let target_sample_rate = config.target_sample_rate();
    let in_range = |c: &&cpal::SupportedStreamConfigRange| {
        target_sample_rate >= c.min_sample_rate().0 && target_sample_rate <= c.max_sample_rate().0
    };

    // Stereo at the target rate in the preferred format, then any stereo
    // config at the target rate, then any stereo config, then anything
    let best_config = SUPPORTED_FORMATS
        .iter()
        .find_map(|format| {
            supported_configs
                .iter()
                .filter(|c| c.sample_format() == *format && c.channels() >= 2)
                .find(in_range)
        })
        .or_else(|| supported_configs.iter().find(in_range))
        .or_else(|| supported_configs.iter().find(|c| c.channels() >= 2))
        .or_else(|| supported_configs.first())
        .ok_or_else(|| {
            AudioError::ConfigError("No suitable output configuration found".to_string())
        })?;

    let sample_rate = if in_range(&best_config) {
        cpal::SampleRate(target_sample_rate)
    } else {
        let fallback = best_config.max_sample_rate();
        log::warn!(
            "Audio device doesn't support {}Hz, falling back to {}Hz (sounds will be resampled)",
            target_sample_rate,
            fallback.0
        );
        fallback
    };

    let stream_config = best_config.clone().with_sample_rate(sample_rate);

    let buffer_size = match config.buffer_size {
        BufferSize::Default => DEFAULT_BUFFER_SIZE,
        BufferSize::Fixed(frames) => frames.clamp(64, MAX_BUFFER_SIZE as u32),
    };

    log::debug!(
        "Selected buffer size: {} frames for {:?}",
        buffer_size,
        config.buffer_size
    );

    Ok((stream_config, buffer_size))
}

/// Build the output stream for device sample type `T`
///
/// The frame buffer is allocated here, once; device buffers larger than it
/// are mixed in several passes.
fn build_output_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut callback: MixCallback,
) -> AudioResult<Stream>
where
    T: SizedSample + FromSample<Sample>,
{
    let channels = config.channels as usize;
    let mut frames = vec![StereoFrame::silence(); MAX_BUFFER_SIZE];

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
                for chunk in data.chunks_mut(MAX_BUFFER_SIZE * channels) {
                    let mixed = &mut frames[..chunk.len() / channels];
                    callback(mixed);
                    write_frames(chunk, mixed, channels);
                }
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}

/// Convert mixed frames into an interleaved device buffer
fn write_frames<T>(data: &mut [T], frames: &[StereoFrame], channels: usize)
where
    T: SizedSample + FromSample<Sample>,
{
    for (out, frame) in data.chunks_mut(channels).zip(frames) {
        if channels == 1 {
            let mono = (frame.left as i32 + frame.right as i32) / 2;
            out[0] = T::from_sample(mono as Sample);
            continue;
        }

        out[0] = T::from_sample(frame.left);
        out[1] = T::from_sample(frame.right);
        for ch in out.iter_mut().skip(2) {
            *ch = T::EQUILIBRIUM;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_frames_fills_extra_channels() {
        let frames = [StereoFrame::new(i16::MAX, i16::MIN), StereoFrame::new(0, 0)];
        let mut data = [1.0f32; 8];
        write_frames(&mut data, &frames, 4);
        assert!(data[0] > 0.99);
        assert_eq!(data[1], -1.0);
        assert_eq!(&data[2..4], &[0.0, 0.0]);
        assert_eq!(&data[4..], &[0.0; 4]);
    }

    #[test]
    fn test_write_frames_mono_averages() {
        let frames = [StereoFrame::new(1000, 3000)];
        let mut data = [0i16; 1];
        write_frames(&mut data, &frames, 1);
        assert_eq!(data[0], 2000);
    }

    #[test]
    fn test_open_default_device() {
        // Hardware dependent: only reports what it finds
        match CpalBackend::open(&AudioConfig::default()) {
            Ok(backend) => println!(
                "Opened {} at {}Hz ({:.1}ms)",
                backend.device_name(),
                backend.sample_rate(),
                backend.latency_ms()
            ),
            Err(e) => println!("No usable output device (expected in CI): {}", e),
        }
    }
}
