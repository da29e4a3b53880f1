//! Audio output backends
//!
//! The mixer never talks to a device directly. It is bound to an
//! [`AudioBackend`], which reports the output rate and calls the mixer's
//! callback from its own thread whenever it needs more frames.
//!
//! - [`CpalBackend`]: cross-platform device output via CPAL
//! - [`OfflineBackend`]: renders on demand, for tests and render-to-file
//!
//! # Example Usage
//!
//! ```ignore
//! use mixdown_core::audio::{AudioConfig, CpalBackend};
//! use mixdown_core::mixer::Mixer;
//!
//! let mixer = Mixer::new();
//! let backend = CpalBackend::open(&AudioConfig::default().with_sample_rate(44100))?;
//! let binding = mixer.bind(backend)?;
//! // ... play sounds through `mixer` ...
//! drop(binding);
//! ```

mod backend;
mod config;
mod cpal_backend;
mod device;
mod error;
mod offline;

pub use backend::{AudioBackend, MixCallback};
pub use config::{
    AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE, MAX_BUFFER_SIZE,
};
pub use cpal_backend::CpalBackend;
pub use device::{find_device_by_id, get_cpal_default_device, get_output_devices, AudioDevice};
pub use error::{AudioError, AudioResult};
pub use offline::OfflineBackend;
