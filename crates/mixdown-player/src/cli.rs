//! Command line parsing

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

pub const USAGE: &str = "\
Usage: mixdown-player [OPTIONS] [FILE...]

Plays each FILE (MP3, Ogg Vorbis, FLAC, WAV) at once through the mixer.
Without files, plays a one second test tone.

Options:
  --render OUT.wav   Render to a 16-bit stereo WAV file instead of the device
  --music            Play files as music (music volume applies)
  --volume N         Channel volume, 0-255 (default 255)
  --pan P            Pan, -127 (left) to 127 (right) (default 0)
  --loop             Loop every sound (files are decoded up front and
                     play as effects)
  --seconds S        Stop after S seconds (default: when all sounds end,
                     or 10 seconds when looping)
  --rate HZ          Output sample rate (overrides the config file)
  -h, --help         Show this help";

/// Length used when looping and no --seconds is given
pub const DEFAULT_LOOP_SECONDS: f32 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub render: Option<PathBuf>,
    pub music: bool,
    pub volume: u8,
    pub pan: i8,
    pub looping: bool,
    pub seconds: Option<f32>,
    pub rate: Option<u32>,
    pub files: Vec<PathBuf>,
    pub help: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            render: None,
            music: false,
            volume: 255,
            pan: 0,
            looping: false,
            seconds: None,
            rate: None,
            files: Vec::new(),
            help: false,
        }
    }
}

impl Options {
    /// How long to run, if bounded
    pub fn max_seconds(&self) -> Option<f32> {
        match (self.seconds, self.looping) {
            (Some(seconds), _) => Some(seconds),
            (None, true) => Some(DEFAULT_LOOP_SECONDS),
            (None, false) => None,
        }
    }
}

/// Parse arguments (without the program name)
pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Options> {
    let mut options = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => options.help = true,
            "--music" => options.music = true,
            "--loop" => options.looping = true,
            "--render" => options.render = Some(PathBuf::from(value(&mut args, &arg)?)),
            "--volume" => {
                options.volume = value(&mut args, &arg)?
                    .parse()
                    .context("--volume expects 0-255")?
            }
            "--pan" => {
                let pan: i8 = value(&mut args, &arg)?
                    .parse()
                    .context("--pan expects -127 to 127")?;
                options.pan = pan.max(-127);
            }
            "--seconds" => {
                let seconds: f32 = value(&mut args, &arg)?
                    .parse()
                    .context("--seconds expects a number")?;
                if seconds.is_nan() || seconds <= 0.0 {
                    bail!("--seconds must be positive");
                }
                options.seconds = Some(seconds);
            }
            "--rate" => {
                let rate: u32 = value(&mut args, &arg)?
                    .parse()
                    .context("--rate expects a sample rate in Hz")?;
                if rate == 0 {
                    bail!("--rate must be positive");
                }
                options.rate = Some(rate);
            }
            flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
            file => options.files.push(PathBuf::from(file)),
        }
    }

    Ok(options)
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .with_context(|| format!("{} needs a value", flag))
}
