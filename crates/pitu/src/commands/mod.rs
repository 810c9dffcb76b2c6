//! Command handlers.

pub mod config_cmd;
pub mod router;
pub mod sanitize;
pub mod serve;

use pitu_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load config from `--config` (or `PITU_CONFIG`) when given, otherwise
/// from the platform config path. Environment overrides apply either way.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let config = match global.config {
        Some(ref path) => pitu_config::load_config_from(path)?,
        None => pitu_config::load_config()?,
    };
    Ok(config)
}

pub fn config_path(global: &GlobalOpts) -> std::path::PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(pitu_config::config_path)
}
