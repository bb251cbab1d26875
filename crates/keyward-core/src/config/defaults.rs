//! Platform default locations
//!
//! All platform lookups happen here, once. Everything downstream receives an
//! explicit [`ConfigDefaults`] (and from it a [`super::Config`]) so tests can
//! point every path into a scratch directory.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Directory name used under the platform config directory
pub const APP_NAME: &str = "keyward";

const CONFIG_FILE_NAME: &str = "config.json";
const MANIFEST_FILE_NAME: &str = "keys.json";

/// Default locations used when the config file leaves a field unset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDefaults {
    pub config_path: PathBuf,
    pub key_dir: PathBuf,
    pub manifest_path: PathBuf,
}

impl ConfigDefaults {
    /// Resolve defaults from the platform directories.
    ///
    /// - config: `<config_dir>/keyward/config.json`
    /// - key dir: `<home>/.ssh/keyward`
    /// - manifest: `<config_dir>/keyward/keys.json`
    pub fn platform() -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoPlatformDir { what: "config" })?;
        let home = dirs::home_dir().ok_or(ConfigError::NoPlatformDir { what: "home" })?;
        Ok(Self::rooted_at(&config_dir, &home))
    }

    /// Lay out the defaults under explicit config and home directories.
    pub fn rooted_at(config_dir: &Path, home: &Path) -> Self {
        let app_dir = config_dir.join(APP_NAME);
        Self {
            config_path: app_dir.join(CONFIG_FILE_NAME),
            key_dir: home.join(".ssh").join(APP_NAME),
            manifest_path: app_dir.join(MANIFEST_FILE_NAME),
        }
    }

    /// Read the config file from `path` instead of the default location.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }
}
