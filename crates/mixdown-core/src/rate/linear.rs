//! Linear-interpolating converter for arbitrary rate ratios
//!
//! The output position advances by `in_rate / out_rate` input frames per
//! output frame, kept as a 16.16 fixed-point fraction. Each output frame is
//! interpolated between the last two input frames pulled.
//!
//! Input is pulled lazily and only as far as the requested output needs,
//! so the stream is never read ahead of what this call mixes.

use super::{frame_sides, scale, RateConverter, Volume, CHUNK_FRAMES};
use crate::stream::AudioInputStream;
use crate::types::{Sample, StereoFrame};

const FRAC_BITS: u32 = 16;
const FRAC_ONE: u32 = 1 << FRAC_BITS;
const FRAC_HALF: i64 = 1 << (FRAC_BITS - 1);

pub struct LinearRateConverter {
    stereo: bool,
    reverse_stereo: bool,
    /// Input frames per output frame (16.16)
    opos_inc: u32,
    /// Position of the next output frame relative to `ilast` (16.16)
    opos: u32,
    ilast: (Sample, Sample),
    icur: (Sample, Sample),
    inbuf: Box<[Sample]>,
    in_pos: usize,
    in_len: usize,
}

impl LinearRateConverter {
    pub fn new(in_rate: u32, out_rate: u32, stereo: bool, reverse_stereo: bool) -> Self {
        let opos_inc = ((in_rate as u64) << FRAC_BITS) / out_rate.max(1) as u64;
        Self {
            stereo,
            reverse_stereo,
            opos_inc: opos_inc.clamp(1, u32::MAX as u64) as u32,
            opos: FRAC_ONE,
            ilast: (0, 0),
            icur: (0, 0),
            inbuf: vec![0; CHUNK_FRAMES * 2].into_boxed_slice(),
            in_pos: 0,
            in_len: 0,
        }
    }

    /// Input frames that must be pulled to produce `outputs` more frames
    fn frames_needed(&self, outputs: usize) -> usize {
        let last = self.opos as u64 + (outputs as u64 - 1) * self.opos_inc as u64;
        (last >> FRAC_BITS) as usize
    }
}

#[inline]
fn interpolate(from: Sample, to: Sample, frac: u32) -> Sample {
    let delta = to as i64 - from as i64;
    (from as i64 + ((delta * frac as i64 + FRAC_HALF) >> FRAC_BITS)) as Sample
}

impl RateConverter for LinearRateConverter {
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
            // Pull input until the output position falls between ilast and icur
            while self.opos >= FRAC_ONE {
                if self.in_pos >= self.in_len {
                    let frames = self.frames_needed(out.len() - done).clamp(1, CHUNK_FRAMES);
                    self.in_len = input.read(&mut self.inbuf[..frames * channels]);
                    self.in_pos = 0;
                    if self.in_len == 0 {
                        return done;
                    }
                }

                let frame = &self.inbuf[self.in_pos..self.in_pos + channels];
                self.ilast = self.icur;
                self.icur = frame_sides(frame, self.stereo, self.reverse_stereo);
                self.in_pos += channels;
                self.opos -= FRAC_ONE;
            }

            while self.opos < FRAC_ONE && done < out.len() {
                let left = interpolate(self.ilast.0, self.icur.0, self.opos);
                let right = interpolate(self.ilast.1, self.icur.1, self.opos);
                out[done].mix_in(scale(left, vol_l), scale(right, vol_r));
                done += 1;
                self.opos += self.opos_inc;
            }
        }

        done
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::VecStream;
    use super::*;

    #[test]
    fn test_upsample_constant_settles_to_input() {
        let mut input = VecStream::mono(vec![1000; 10], 11025);
        let mut conv = LinearRateConverter::new(11025, 22050, false, false);
        let mut out = vec![StereoFrame::silence(); 40];

        let produced = conv.flow(&mut input, &mut out, 256, 256);
        assert_eq!(produced, 20, "10 input frames at 2x yield 20 output frames");
        assert_eq!(out[0], StereoFrame::silence(), "starts from silence");
        assert_eq!(out[1], StereoFrame::mono(500), "ramp up from silence");
        assert!(out[2..produced].iter().all(|f| *f == StereoFrame::mono(1000)));
        assert!(input.end_of_data());
    }

    #[test]
    fn test_pulls_only_what_the_output_needs() {
        let mut input = VecStream::mono(vec![0; 100], 11025);
        let mut conv = LinearRateConverter::new(11025, 22050, false, false);
        let mut out = vec![StereoFrame::silence(); 8];

        assert_eq!(conv.flow(&mut input, &mut out, 256, 256), 8);
        assert_eq!(input.pos, 4);

        // The next call continues where the last stopped
        assert_eq!(conv.flow(&mut input, &mut out, 256, 256), 8);
        assert_eq!(input.pos, 8);
    }

    #[test]
    fn test_downsample_skips_frames() {
        let ramp: Vec<i16> = (0..100).map(|i| i * 10).collect();
        let mut input = VecStream::mono(ramp, 44100);
        let mut conv = LinearRateConverter::new(44100, 22050, false, false);
        let mut out = vec![StereoFrame::silence(); 10];

        assert_eq!(conv.flow(&mut input, &mut out, 256, 256), 10);
        // Output j lands on input frame 2j - 1
        assert_eq!(out[3], StereoFrame::mono(50));
        assert_eq!(out[9], StereoFrame::mono(170));
        assert_eq!(input.pos, 19);
    }

    #[test]
    fn test_stereo_sides_interpolated_independently() {
        let samples: Vec<i16> = (0..20).flat_map(|_| [400, -400]).collect();
        let mut input = VecStream::stereo(samples, 8000);
        let mut conv = LinearRateConverter::new(8000, 16000, true, false);
        let mut out = vec![StereoFrame::silence(); 6];

        conv.flow(&mut input, &mut out, 256, 256);
        assert_eq!(out[1], StereoFrame::new(200, -200));
        assert_eq!(out[5], StereoFrame::new(400, -400));
    }

    #[test]
    fn test_interpolate_midpoint() {
        assert_eq!(interpolate(0, 1000, FRAC_ONE / 2), 500);
        assert_eq!(interpolate(-32768, 32767, 0), -32768);
        // The last fractional step stops one short of the target
        assert_eq!(interpolate(-32768, 32767, FRAC_ONE - 1), 32766);
    }
}
