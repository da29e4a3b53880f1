//! Same-rate converter: one input frame per output frame

use super::{frame_sides, scale, RateConverter, Volume, CHUNK_FRAMES};
use crate::stream::AudioInputStream;
use crate::types::{Sample, StereoFrame};

pub struct CopyRateConverter {
    stereo: bool,
    reverse_stereo: bool,
    scratch: Box<[Sample]>,
}

impl CopyRateConverter {
    pub fn new(stereo: bool, reverse_stereo: bool) -> Self {
        Self {
            stereo,
            reverse_stereo,
            scratch: vec![0; CHUNK_FRAMES * 2].into_boxed_slice(),
        }
    }
}

impl RateConverter for CopyRateConverter {
    fn flow(
        &mut self,
        input: &mut dyn AudioInputStream,
        out: &mut [StereoFrame],
        vol_l: Volume,
        vol_r: Volume,
    ) -> usize {
        let channels = if self.stereo { 2 } else { 1 };
        let mut done = 0;

        while done < out.len() {
            let wanted = (out.len() - done).min(CHUNK_FRAMES);
            let frames = input.read(&mut self.scratch[..wanted * channels]) / channels;
            if frames == 0 {
                break;
            }

            let source = self.scratch[..frames * channels].chunks_exact(channels);
            for (frame, src) in out[done..done + frames].iter_mut().zip(source) {
                let (left, right) = frame_sides(src, self.stereo, self.reverse_stereo);
                frame.mix_in(scale(left, vol_l), scale(right, vol_r));
            }

            done += frames;
            if frames < wanted {
                break;
            }
        }

        done
    }
}
