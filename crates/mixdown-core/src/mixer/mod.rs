//! The software mixer
//!
//! A fixed bank of [`NUM_CHANNELS`] channel slots, each holding one playing
//! sound. The audio backend calls [`Mixer::mix`] from its own thread; every
//! other method is a control operation called from the application. Both
//! sides go through one mutex, so a control call never observes a channel
//! half-way through a mix pass.
//!
//! # Lifecycle
//!
//! ```ignore
//! let mixer = Mixer::new();
//! let binding = mixer.bind(CpalBackend::open(&AudioConfig::default())?)?;
//!
//! let handle = mixer.play_raw(samples, 22050, SoundFlags::empty(), PlayParams::default())?;
//! mixer.set_channel_pan(&handle, -64);
//!
//! drop(binding); // callback removed first, then every channel destroyed
//! ```
//!
//! # Channel lifetime
//!
//! A channel lives in its slot until its stream ends (detected during a mix
//! pass) or it is stopped. Either way the [`SoundHandle`] returned at
//! creation goes dead immediately, and control calls through it become
//! no-ops. The channel's memory is released on the collector thread, never
//! inside the audio callback.

mod channel;
mod error;
mod gc;
mod handle;

pub use error::{MixerError, MixerResult};
pub use gc::gc_handle;
pub use handle::SoundHandle;

use std::ops::Range;
use std::sync::Arc;

use basedrop::Owned;
use parking_lot::Mutex;

use crate::audio::{AudioBackend, AudioError, AudioResult, MAX_BUFFER_SIZE};
use crate::config::MixerSettings;
use crate::stream::{
    AppendableStream, AudioInputStream, DecoderStream, LinearStream, MediaSource, RawBuffer,
    SoundFlags, StreamError,
};
use crate::types::{silence, StereoFrame, MAX_CHANNEL_VOLUME, MAX_MIXER_VOLUME, NUM_CHANNELS};

use channel::{Channel, ChannelOptions, ChannelSource, MixStatus};

/// Hook run at the start of every unpaused mix pass, before any channel
///
/// It receives the freshly zeroed output buffer and may write into it
/// directly (e.g. a music engine rendering its own output).
pub type PremixHook = Box<dyn FnMut(&mut [StereoFrame]) + Send>;

/// Options for [`Mixer::play_raw`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayParams {
    /// De-duplication tag; a second sound with a live id is rejected
    pub id: Option<i32>,
    pub volume: u8,
    pub pan: i8,
    /// Loop region in bytes, used with [`SoundFlags::LOOP`]
    pub loop_range: Option<Range<usize>>,
}

impl Default for PlayParams {
    fn default() -> Self {
        Self {
            id: None,
            volume: MAX_CHANNEL_VOLUME,
            pan: 0,
            loop_range: None,
        }
    }
}

impl PlayParams {
    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_volume(mut self, volume: u8) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_pan(mut self, pan: i8) -> Self {
        self.pan = pan;
        self
    }

    pub fn with_loop(mut self, range: Range<usize>) -> Self {
        self.loop_range = Some(range);
        self
    }
}

type Slot = Option<Owned<Channel>>;

struct MixerState {
    /// 0 until bound
    output_rate: u32,
    channels: [Slot; NUM_CHANNELS],
    global_volume: i32,
    music_volume: i32,
    paused: bool,
    premix: Option<PremixHook>,
    gc: basedrop::Handle,
}

impl MixerState {
    fn live_channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().flatten().map(|channel| &**channel)
    }

    /// Channel addressed by `handle`, if it is still the one in that slot
    fn channel_for(&mut self, handle: &SoundHandle) -> Option<(usize, &mut Channel)> {
        let index = handle.index()?;
        let channel = self.channels.get_mut(index)?.as_deref_mut()?;
        channel.handle().same_as(handle).then_some((index, channel))
    }

    fn insert(
        &mut self,
        source: ChannelSource,
        options: ChannelOptions,
    ) -> MixerResult<SoundHandle> {
        let index = self.free_slot(options.id)?;
        let handle = SoundHandle::new(index);
        let channel = Channel::new(source, self.output_rate, handle.clone(), options);
        self.channels[index] = Some(Owned::new(&self.gc, channel));
        Ok(handle)
    }

    /// First free slot, after checking that `id` is not already playing
    fn free_slot(&self, id: Option<i32>) -> MixerResult<usize> {
        if self.output_rate == 0 {
            return Err(MixerError::NotBound);
        }
        if let Some(id) = id {
            if self.live_channels().any(|c| c.id() == Some(id)) {
                log::debug!("play: id {} is already playing", id);
                return Err(MixerError::DuplicateId(id));
            }
        }
        self.channels.iter().position(Option::is_none).ok_or_else(|| {
            log::warn!("play: all {} channels are in use", NUM_CHANNELS);
            MixerError::NoFreeSlot
        })
    }

    fn stop_all(&mut self) {
        self.channels.iter_mut().for_each(destroy);
    }
}

/// Empty a slot, killing the channel's handle right away
///
/// The channel itself is freed later by the collector.
fn destroy(slot: &mut Slot) {
    if let Some(channel) = slot.take() {
        channel.handle().invalidate();
    }
}

pub struct Mixer {
    state: Mutex<MixerState>,
    /// Frame buffer for byte output that cannot be viewed as frames in place
    byte_scratch: Mutex<Box<[StereoFrame]>>,
}

impl Mixer {
    pub fn new() -> Arc<Self> {
        Self::with_settings(&MixerSettings::default())
    }

    /// Create a mixer with initial volumes from `settings`
    pub fn with_settings(settings: &MixerSettings) -> Arc<Self> {
        let state = MixerState {
            output_rate: 0,
            channels: std::array::from_fn(|_| None),
            global_volume: settings.volume.clamp(0, MAX_MIXER_VOLUME),
            music_volume: settings.music_volume.clamp(0, MAX_MIXER_VOLUME),
            paused: false,
            premix: None,
            gc: gc_handle(),
        };
        let byte_scratch = vec![StereoFrame::silence(); MAX_BUFFER_SIZE].into_boxed_slice();
        Arc::new(Self {
            state: Mutex::new(state),
            byte_scratch: Mutex::new(byte_scratch),
        })
    }

    /// Attach the mixer to an audio backend
    ///
    /// Fixes the output rate to the backend's rate and installs the mix
    /// callback. Fails if the backend reports a rate of 0 or the mixer is
    /// already bound.
    pub fn bind<B: AudioBackend>(self: &Arc<Self>, mut backend: B) -> AudioResult<MixerBinding<B>> {
        let rate = backend.sample_rate();
        if rate == 0 {
            log::error!("bind: backend reported a sample rate of 0");
            return Err(AudioError::InvalidSampleRate(rate));
        }

        {
            let mut state = self.state.lock();
            if state.output_rate != 0 {
                return Err(AudioError::AlreadyBound);
            }
            state.output_rate = rate;
        }

        let mixer = Arc::clone(self);
        let callback = Box::new(move |frames: &mut [StereoFrame]| mixer.mix(frames));
        if let Err(e) = backend.set_mix_callback(callback) {
            self.state.lock().output_rate = 0;
            return Err(e);
        }

        log::info!("Mixer bound at {}Hz", rate);

        Ok(MixerBinding {
            mixer: Arc::clone(self),
            backend: Some(backend),
        })
    }

    /// Install the pre-mix hook, replacing any previous one
    pub fn setup_premix(&self, hook: impl FnMut(&mut [StereoFrame]) + Send + 'static) {
        self.state.lock().premix = Some(Box::new(hook));
    }

    pub fn clear_premix(&self) {
        self.state.lock().premix = None;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Playback
    // ─────────────────────────────────────────────────────────────────────

    /// Play a raw PCM block
    ///
    /// `data` as [`RawBuffer::Owned`] is released with the channel;
    /// [`RawBuffer::Shared`] leaves the caller's copy alive.
    pub fn play_raw(
        &self,
        data: impl Into<RawBuffer>,
        rate: u32,
        flags: SoundFlags,
        params: PlayParams,
    ) -> MixerResult<SoundHandle> {
        let mut state = self.state.lock();
        state.free_slot(params.id)?;

        let stream = LinearStream::new(data.into(), rate, flags, params.loop_range)?;
        state.insert(
            ChannelSource::Raw(stream),
            ChannelOptions {
                is_music: false,
                volume: params.volume,
                pan: params.pan,
                id: params.id,
                reverse_stereo: flags.contains(SoundFlags::REVERSE_STEREO),
            },
        )
    }

    /// Start a music-class streaming channel
    ///
    /// `buffer_size` is the stream's capacity in bytes; `initial` must fit
    /// in it. Feed more with [`append_stream`](Self::append_stream) and
    /// close with [`end_stream`](Self::end_stream).
    pub fn new_stream(
        &self,
        initial: &[u8],
        rate: u32,
        flags: SoundFlags,
        buffer_size: usize,
        volume: u8,
        pan: i8,
    ) -> MixerResult<SoundHandle> {
        if initial.len() > buffer_size {
            return Err(StreamError::InitialDataTooLarge {
                len: initial.len(),
                capacity: buffer_size,
            }
            .into());
        }

        let mut state = self.state.lock();
        state.free_slot(None)?;

        let mut stream = AppendableStream::new(rate, flags, buffer_size)?;
        stream.append(initial)?;
        state.insert(
            ChannelSource::Stream(stream),
            ChannelOptions {
                is_music: true,
                volume,
                pan,
                id: None,
                reverse_stereo: flags.contains(SoundFlags::REVERSE_STEREO),
            },
        )
    }

    /// Append PCM to a streaming channel
    ///
    /// A dead handle is logged and ignored.
    pub fn append_stream(&self, handle: &SoundHandle, data: &[u8]) -> MixerResult<()> {
        let mut state = self.state.lock();
        match state.channel_for(handle) {
            Some((index, channel)) => channel.append(index, data),
            None => {
                log::warn!("append_stream: sound handle is no longer valid");
                Ok(())
            }
        }
    }

    /// Declare a streaming channel complete; it ends once drained
    pub fn end_stream(&self, handle: &SoundHandle) -> MixerResult<()> {
        let mut state = self.state.lock();
        match state.channel_for(handle) {
            Some((index, channel)) => channel.finish(index),
            None => {
                log::warn!("end_stream: sound handle is no longer valid");
                Ok(())
            }
        }
    }

    /// Play any input stream
    pub fn play_input_stream(
        &self,
        stream: Box<dyn AudioInputStream>,
        is_music: bool,
        volume: u8,
        pan: i8,
    ) -> MixerResult<SoundHandle> {
        if stream.rate() == 0 {
            return Err(StreamError::InvalidRate(0).into());
        }
        self.state.lock().insert(
            ChannelSource::Generic(stream),
            ChannelOptions {
                is_music,
                volume,
                pan,
                id: None,
                reverse_stereo: false,
            },
        )
    }

    /// Decode and play compressed audio (MP3, Ogg Vorbis, FLAC, WAV)
    ///
    /// The source is probed before the mixer lock is taken.
    pub fn play_decoded(
        &self,
        source: Box<dyn MediaSource>,
        extension: Option<&str>,
        is_music: bool,
        volume: u8,
        pan: i8,
    ) -> MixerResult<SoundHandle> {
        let stream = DecoderStream::open(source, extension)?;
        self.play_input_stream(Box::new(stream), is_music, volume, pan)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Stopping
    // ─────────────────────────────────────────────────────────────────────

    pub fn stop_all(&self) {
        self.state.lock().stop_all();
    }

    /// Stop whatever plays in slot `index`
    pub fn stop_channel(&self, index: usize) {
        let mut state = self.state.lock();
        match state.channels.get_mut(index) {
            Some(slot) => destroy(slot),
            None => log::warn!("stop_channel: invalid index {}", index),
        }
    }

    pub fn stop_id(&self, id: i32) {
        let mut state = self.state.lock();
        for slot in state.channels.iter_mut() {
            if slot.as_ref().is_some_and(|c| c.id() == Some(id)) {
                destroy(slot);
            }
        }
    }

    pub fn stop_handle(&self, handle: &SoundHandle) {
        let mut state = self.state.lock();
        match state.channel_for(handle).map(|(index, _)| index) {
            Some(index) => destroy(&mut state.channels[index]),
            None => log::debug!("stop_handle: sound already stopped"),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Channel control
    // ─────────────────────────────────────────────────────────────────────

    pub fn set_channel_volume(&self, handle: &SoundHandle, volume: u8) {
        let mut state = self.state.lock();
        match state.channel_for(handle) {
            Some((_, channel)) => channel.set_volume(volume),
            None => log::debug!("set_channel_volume: sound handle is no longer valid"),
        }
    }

    /// Pan from -127 (left) to 127 (right); -128 counts as -127
    pub fn set_channel_pan(&self, handle: &SoundHandle, pan: i8) {
        let mut state = self.state.lock();
        match state.channel_for(handle) {
            Some((_, channel)) => channel.set_pan(pan),
            None => log::debug!("set_channel_pan: sound handle is no longer valid"),
        }
    }

    pub fn pause_channel(&self, index: usize, paused: bool) {
        let mut state = self.state.lock();
        match state.channels.get_mut(index) {
            Some(Some(channel)) => channel.pause(paused),
            Some(None) => {}
            None => log::warn!("pause_channel: invalid index {}", index),
        }
    }

    pub fn pause_id(&self, id: i32, paused: bool) {
        let mut state = self.state.lock();
        for channel in state.channels.iter_mut().flatten() {
            if channel.id() == Some(id) {
                channel.pause(paused);
            }
        }
    }

    pub fn pause_handle(&self, handle: &SoundHandle, paused: bool) {
        let mut state = self.state.lock();
        match state.channel_for(handle) {
            Some((_, channel)) => channel.pause(paused),
            None => log::debug!("pause_handle: sound handle is no longer valid"),
        }
    }

    /// Pause the whole mixer; passes produce silence and streams hold still
    pub fn pause_all(&self, paused: bool) {
        self.state.lock().paused = paused;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Global state
    // ─────────────────────────────────────────────────────────────────────

    /// Sound-effect volume, clamped to `0..=256`
    pub fn set_volume(&self, volume: i32) {
        self.state.lock().global_volume = volume.clamp(0, MAX_MIXER_VOLUME);
    }

    /// Music volume, clamped to `0..=256`
    pub fn set_music_volume(&self, volume: i32) {
        self.state.lock().music_volume = volume.clamp(0, MAX_MIXER_VOLUME);
    }

    pub fn volume(&self) -> i32 {
        self.state.lock().global_volume
    }

    pub fn music_volume(&self) -> i32 {
        self.state.lock().music_volume
    }

    /// Output rate in Hz, 0 while unbound
    pub fn output_rate(&self) -> u32 {
        self.state.lock().output_rate
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// True if any live channel is a sound effect (not music)
    pub fn has_active_sfx_channel(&self) -> bool {
        self.state.lock().live_channels().any(|c| !c.is_music())
    }

    pub fn active_channel_count(&self) -> usize {
        self.state.lock().live_channels().count()
    }

    /// Whether `handle` still addresses a live channel of this mixer
    pub fn is_handle_active(&self, handle: &SoundHandle) -> bool {
        self.state.lock().channel_for(handle).is_some()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mixing
    // ─────────────────────────────────────────────────────────────────────

    /// Render one buffer; called from the audio backend
    ///
    /// The buffer is zeroed first, so it is always fully written.
    pub fn mix(&self, out: &mut [StereoFrame]) {
        silence(out);

        let mut state = self.state.lock();
        if state.paused {
            return;
        }

        if let Some(premix) = state.premix.as_mut() {
            premix(out);
        }

        let global = state.global_volume;
        let music = state.music_volume;
        for (index, slot) in state.channels.iter_mut().enumerate() {
            let status = match slot.as_deref_mut() {
                Some(channel) if !channel.is_paused() => {
                    let volume = if channel.is_music() { music } else { global };
                    channel.mix(out, volume)
                }
                _ => continue,
            };

            if status == MixStatus::Finished {
                log::debug!("mix: channel {} finished", index);
                destroy(slot);
            }
        }
    }

    /// Render into an interleaved byte buffer (4 bytes per stereo frame,
    /// native endian)
    ///
    /// Buffers at any address are mixed; a misaligned one goes through a
    /// pre-allocated frame buffer in blocks. A trailing partial frame is
    /// zeroed.
    pub fn mix_bytes(&self, out: &mut [u8]) {
        let whole = out.len() - out.len() % StereoFrame::BYTES;
        let (body, tail) = out.split_at_mut(whole);
        tail.fill(0);

        if let Ok(frames) = bytemuck::try_cast_slice_mut::<u8, StereoFrame>(body) {
            self.mix(frames);
            return;
        }

        let mut scratch = self.byte_scratch.lock();
        for chunk in body.chunks_mut(scratch.len() * StereoFrame::BYTES) {
            let frames = &mut scratch[..chunk.len() / StereoFrame::BYTES];
            self.mix(frames);
            chunk.copy_from_slice(bytemuck::cast_slice(&*frames));
        }
    }
}

/// A mixer attached to a backend
///
/// Owns the backend. Dropping the binding (or calling
/// [`unbind`](Self::unbind)) removes the mix callback and then destroys
/// every channel, after which the mixer can be bound again.
pub struct MixerBinding<B: AudioBackend> {
    mixer: Arc<Mixer>,
    backend: Option<B>,
}

impl<B: AudioBackend> MixerBinding<B> {
    pub fn mixer(&self) -> &Arc<Mixer> {
        &self.mixer
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }

    /// Detach from the backend and hand it back
    pub fn unbind(mut self) -> Option<B> {
        self.teardown()
    }

    fn teardown(&mut self) -> Option<B> {
        let mut backend = self.backend.take()?;
        backend.clear_mix_callback();

        let mut state = self.mixer.state.lock();
        state.stop_all();
        state.output_rate = 0;
        log::info!("Mixer unbound");

        Some(backend)
    }
}

impl<B: AudioBackend> Drop for MixerBinding<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
