//! Effective configuration for a CLI invocation

use std::path::Path;

use keyward_core::{Config, ConfigDefaults};

use crate::error::Result;

/// Platform defaults, with the config file location replaced by `--config` when given.
pub fn defaults(config_override: Option<&Path>) -> Result<ConfigDefaults> {
    let defaults = ConfigDefaults::platform()?;
    Ok(match config_override {
        Some(path) => defaults.with_config_path(path),
        None => defaults,
    })
}

/// Load the effective configuration.
pub fn load(config_override: Option<&Path>) -> Result<Config> {
    let defaults = defaults(config_override)?;
    tracing::debug!(config = %defaults.config_path.display(), "loading configuration");
    Ok(Config::load(&defaults)?)
}
