//! Subcommand implementations.

pub mod config;
pub mod serve;

use chexgate_core::Config;
use std::path::Path;

/// Load config from an explicit path, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config, chexgate_core::ConfigError> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}
