//! Configuration utilities
//!
//! - Generic YAML config loading/saving
//! - Standard config paths
//! - Mixer settings (initial volumes)
//!
//! # Usage
//!
//! ```ignore
//! use mixdown_core::config::{default_config_path, load_config, save_config};
//!
//! let path = default_config_path("player.yaml");
//! let config: MyAppConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod io;
mod paths;
mod settings;

pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path};
pub use settings::MixerSettings;
