//! Offline backend
//!
//! Nothing runs on its own: audio is produced only when [`render`] is
//! called, on the caller's thread. Used by tests and to render mixes to
//! a file.
//!
//! [`render`]: OfflineBackend::render

use crate::types::{silence, StereoFrame};

use super::backend::{AudioBackend, MixCallback};
use super::error::AudioResult;

pub struct OfflineBackend {
    sample_rate: u32,
    callback: Option<MixCallback>,
}

impl OfflineBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            callback: None,
        }
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Pull `frames` frames through the callback
    ///
    /// Silence if no callback is installed.
    pub fn render(&mut self, frames: usize) -> Vec<StereoFrame> {
        let mut out = vec![StereoFrame::silence(); frames];
        self.render_into(&mut out);
        out
    }

    /// Fill `out` through the callback
    pub fn render_into(&mut self, out: &mut [StereoFrame]) {
        match self.callback.as_mut() {
            Some(callback) => callback(out),
            None => silence(out),
        }
    }
}

impl AudioBackend for OfflineBackend {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn set_mix_callback(&mut self, callback: MixCallback) -> AudioResult<()> {
        self.callback = Some(callback);
        Ok(())
    }

    fn clear_mix_callback(&mut self) {
        self.callback = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_without_callback() {
        let mut backend = OfflineBackend::new(8000);
        let mut out = vec![StereoFrame::mono(99); 4];
        backend.render_into(&mut out);
        assert!(out.iter().all(|f| *f == StereoFrame::silence()));
    }

    #[test]
    fn test_callback_installed_and_cleared() {
        let mut backend = OfflineBackend::new(8000);
        backend
            .set_mix_callback(Box::new(|out: &mut [StereoFrame]| {
                out.iter_mut().for_each(|f| *f = StereoFrame::new(1, 2))
            }))
            .unwrap();
        assert!(backend.has_callback());
        assert_eq!(backend.render(3), vec![StereoFrame::new(1, 2); 3]);

        backend.clear_mix_callback();
        assert_eq!(backend.render(1), vec![StereoFrame::silence()]);
    }
}
