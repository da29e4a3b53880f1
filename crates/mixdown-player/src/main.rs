//! Mixdown Player - plays or renders sounds through the mixer
//!
//! Decodes each file given on the command line and plays them all at once,
//! either live through the default (or configured) output device or
//! offline into a WAV file with `--render`.
//!
//! Settings come from `~/.config/mixdown/player.yaml`; command line flags
//! override them. Set `RUST_LOG=debug` for verbose output.

mod cli;
mod config;
mod playback;

use anyhow::Result;
use mixdown_core::config::load_config;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let options = cli::parse_args(std::env::args().skip(1))?;
    if options.help {
        println!("{}", cli::USAGE);
        return Ok(());
    }

    let config_path = config::default_config_path();
    let config: config::PlayerConfig = load_config(&config_path);

    match &options.render {
        Some(path) => {
            playback::render_to_wav(path, &config, &options)?;
        }
        None => {
            log::info!("mixdown-player starting");
            playback::play_on_device(&config, &options)?;
            log::info!("mixdown-player stopped");
        }
    }

    Ok(())
}
