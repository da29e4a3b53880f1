//! Audio backend trait
//!
//! A backend owns the output device (or stands in for one) and pulls mixed
//! audio by invoking a callback from its own thread. The mixer installs that
//! callback when it is bound and removes it on teardown:
//!
//! - [`CpalBackend`](super::CpalBackend): real output via CPAL
//! - [`OfflineBackend`](super::OfflineBackend): pull-driven rendering for
//!   tests and render-to-file

use crate::types::StereoFrame;

use super::error::AudioResult;

/// Callback that fills one output buffer with mixed stereo frames
///
/// The callback must write every frame of the buffer it is given.
pub type MixCallback = Box<dyn FnMut(&mut [StereoFrame]) + Send + 'static>;

pub trait AudioBackend {
    /// Output rate in Hz; queried once when the mixer is bound
    fn sample_rate(&self) -> u32;

    /// Install the callback and start pulling audio through it
    fn set_mix_callback(&mut self, callback: MixCallback) -> AudioResult<()>;

    /// Stop calling the callback and drop it
    ///
    /// Once this returns, the callback is not running and will not run again.
    fn clear_mix_callback(&mut self);
}
