//! Queueing sounds and running the mixer, live or offline

use std::f32::consts::TAU;
use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use mixdown_core::audio::{CpalBackend, OfflineBackend};
use mixdown_core::mixer::{Mixer, PlayParams, SoundHandle};
use mixdown_core::stream::{AudioInputStream, DecoderStream, SoundFlags};
use mixdown_core::{as_interleaved, StereoFrame};

use crate::cli::Options;
use crate::config::PlayerConfig;

const TONE_HZ: f32 = 440.0;
const TONE_AMPLITUDE: f32 = 16000.0;

/// Frames rendered per pass in offline mode
const RENDER_BLOCK: usize = 1024;

/// How often live playback checks whether everything finished
const POLL_INTERVAL: Duration = Duration::from_millis(50);

const PCM16: SoundFlags = SoundFlags::BITS_16.union(SoundFlags::LITTLE_ENDIAN);

/// A sine tone as signed 16-bit little-endian mono PCM
pub fn test_tone(rate: u32, seconds: f32) -> Vec<u8> {
    let frames = (rate as f32 * seconds) as usize;
    (0..frames)
        .map(|i| ((i as f32 * TONE_HZ * TAU / rate as f32).sin() * TONE_AMPLITUDE) as i16)
        .flat_map(i16::to_le_bytes)
        .collect()
}

/// Decode a whole file into 16-bit little-endian PCM
///
/// Returns (pcm, rate, stereo).
fn decode_to_pcm(path: &Path) -> Result<(Vec<u8>, u32, bool)> {
    let mut stream = open_decoder(path)?;
    let mut pcm = Vec::new();
    let mut buf = [0i16; 4096];
    loop {
        let n = stream.read(&mut buf);
        if n == 0 {
            break;
        }
        pcm.extend(buf[..n].iter().flat_map(|s| s.to_le_bytes()));
    }
    Ok((pcm, stream.rate(), stream.is_stereo()))
}

fn open_decoder(path: &Path) -> Result<DecoderStream> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let extension = path.extension().and_then(|e| e.to_str());
    DecoderStream::open(Box::new(file), extension)
        .with_context(|| format!("Failed to decode {:?}", path))
}

/// Start every sound the options ask for
pub fn queue_sounds(mixer: &Mixer, options: &Options) -> Result<Vec<SoundHandle>> {
    let params = PlayParams::default()
        .with_volume(options.volume)
        .with_pan(options.pan);
    let loop_flag = if options.looping {
        SoundFlags::LOOP
    } else {
        SoundFlags::empty()
    };

    if options.files.is_empty() {
        log::info!("No files given, playing a {}Hz test tone", TONE_HZ);
        let rate = mixer.output_rate();
        let handle = mixer.play_raw(test_tone(rate, 1.0), rate, PCM16 | loop_flag, params)?;
        return Ok(vec![handle]);
    }

    let mut handles = Vec::with_capacity(options.files.len());
    for path in &options.files {
        let handle = if options.looping {
            let (pcm, rate, stereo) = decode_to_pcm(path)?;
            let mut flags = PCM16 | loop_flag;
            flags.set(SoundFlags::STEREO, stereo);
            mixer.play_raw(pcm, rate, flags, params.clone())?
        } else {
            let stream = open_decoder(path)?;
            mixer.play_input_stream(Box::new(stream), options.music, options.volume, options.pan)?
        };
        log::info!("Playing {:?} ({:?})", path, handle);
        handles.push(handle);
    }
    Ok(handles)
}

fn mixer_for(config: &PlayerConfig) -> std::sync::Arc<Mixer> {
    Mixer::with_settings(&config.mixer)
}

/// Play through the configured output device until done
pub fn play_on_device(config: &PlayerConfig, options: &Options) -> Result<()> {
    let mut audio = config.audio.clone();
    if let Some(rate) = options.rate {
        audio = audio.with_sample_rate(rate);
    }

    let mixer = mixer_for(config);
    let backend = CpalBackend::open(&audio).context("Failed to open audio device")?;
    let binding = mixer.bind(backend).context("Failed to start audio output")?;

    queue_sounds(&mixer, options)?;

    let deadline = options
        .max_seconds()
        .map(|seconds| Instant::now() + Duration::from_secs_f32(seconds));
    while mixer.active_channel_count() > 0 {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            log::info!("Time limit reached");
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    drop(binding);
    Ok(())
}

/// Render offline into a 16-bit stereo WAV file
///
/// Returns the number of frames written.
pub fn render_to_wav(path: &Path, config: &PlayerConfig, options: &Options) -> Result<usize> {
    let rate = options
        .rate
        .unwrap_or_else(|| config.audio.target_sample_rate());

    let mixer = mixer_for(config);
    let mut binding = mixer.bind(OfflineBackend::new(rate))?;
    queue_sounds(&mixer, options)?;

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {:?}", path))?;

    let max_frames = options
        .max_seconds()
        .map(|seconds| (seconds * rate as f32) as usize);
    let backend = binding
        .backend_mut()
        .context("Offline backend already released")?;

    let mut block = vec![StereoFrame::silence(); RENDER_BLOCK];
    let mut written = 0;
    while mixer.active_channel_count() > 0 {
        let frames = max_frames.map_or(RENDER_BLOCK, |max| RENDER_BLOCK.min(max - written));
        if frames == 0 {
            break;
        }

        backend.render_into(&mut block[..frames]);
        for &sample in as_interleaved(&block[..frames]) {
            writer.write_sample(sample)?;
        }
        written += frames;
    }

    writer.finalize().context("Failed to finish WAV file")?;
    log::info!("Rendered {} frames at {}Hz to {:?}", written, rate, path);
    Ok(written)
}
