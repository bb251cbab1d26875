//! Configuration loading
//!
//! The config file is a small JSON object. Every field is optional; gaps are
//! filled from [`ConfigDefaults`]. A missing file means "all defaults".
//!
//! ```json
//! {
//!   "allowed_providers": ["fido2", "software"],
//!   "key_dir": "~/.ssh/keyward",
//!   "manifest_path": "~/.config/keyward/keys.json",
//!   "name_pattern": "^[A-Za-z0-9][A-Za-z0-9._-]{0,63}$",
//!   "version": 1
//! }
//! ```

mod defaults;
mod policy;

pub use defaults::{APP_NAME, ConfigDefaults};
pub use policy::{DEFAULT_NAME_PATTERN, Policy, PolicyError, validate};

use std::path::{Path, PathBuf};

use keyward_fs::{expand_home, io};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::manifest::Provider;

/// Current config file format version
pub const CONFIG_VERSION: u64 = 1;

/// Effective configuration handed to every core operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where this config was (or would be) read from
    pub config_path: PathBuf,
    /// Trusted root for every key file
    pub key_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub policy: Policy,
}

/// What [`Config::init`] did
#[derive(Debug, Clone)]
pub struct InitOutcome {
    pub config: Config,
    /// Whether the config file was (re)written
    pub wrote_config: bool,
}

/// On-disk layout; field order keeps the written keys sorted
#[derive(Serialize)]
struct ConfigFile<'a> {
    allowed_providers: Vec<&'static str>,
    key_dir: &'a Path,
    manifest_path: &'a Path,
    name_pattern: &'a str,
    version: u64,
}

impl Config {
    /// Configuration consisting purely of defaults.
    pub fn from_defaults(defaults: &ConfigDefaults) -> Self {
        Self {
            config_path: defaults.config_path.clone(),
            key_dir: defaults.key_dir.clone(),
            manifest_path: defaults.manifest_path.clone(),
            policy: Policy::default(),
        }
    }

    /// Load the config file named by `defaults`, falling back to defaults when absent.
    pub fn load(defaults: &ConfigDefaults) -> Result<Self, ConfigError> {
        match io::read_optional_text(&defaults.config_path)? {
            Some(content) => Self::parse(&content, defaults),
            None => {
                tracing::debug!(
                    path = %defaults.config_path.display(),
                    "config file not found, using defaults"
                );
                Ok(Self::from_defaults(defaults))
            }
        }
    }

    /// Parse config file content, naming the offending field on failure.
    pub fn parse(content: &str, defaults: &ConfigDefaults) -> Result<Self, ConfigError> {
        let path = &defaults.config_path;
        let data: Value = serde_json::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let schema = |message: String| ConfigError::Schema {
            path: path.clone(),
            message,
        };

        let Value::Object(root) = data else {
            return Err(schema("expected object root".into()));
        };

        let key_dir = path_field(&root, "key_dir")
            .map_err(schema)?
            .unwrap_or_else(|| defaults.key_dir.clone());
        let manifest_path = path_field(&root, "manifest_path")
            .map_err(schema)?
            .unwrap_or_else(|| defaults.manifest_path.clone());

        let allowed_providers = match root.get("allowed_providers") {
            None => Provider::ALL.to_vec(),
            Some(value) => parse_providers(value).map_err(schema)?,
        };

        let name_pattern = match root.get("name_pattern") {
            None => DEFAULT_NAME_PATTERN.to_string(),
            Some(Value::String(pattern)) => pattern.clone(),
            Some(_) => return Err(schema("name_pattern must be a string".into())),
        };

        Ok(Self {
            config_path: path.clone(),
            key_dir,
            manifest_path,
            policy: Policy::new(allowed_providers, name_pattern)?,
        })
    }

    /// Write this configuration to [`Config::config_path`] atomically.
    pub fn save(&self) -> Result<(), ConfigError> {
        let file = ConfigFile {
            allowed_providers: self
                .policy
                .allowed_providers()
                .iter()
                .map(Provider::as_str)
                .collect(),
            key_dir: &self.key_dir,
            manifest_path: &self.manifest_path,
            name_pattern: self.policy.name_pattern(),
            version: CONFIG_VERSION,
        };
        io::write_private_json(&self.config_path, &file)?;
        tracing::info!(path = %self.config_path.display(), "config saved");
        Ok(())
    }

    /// Create the key directory, the manifest directory and, if needed, the config file.
    ///
    /// Without `force` an existing config file is loaded and left untouched;
    /// it must be valid. With `force` the file is rewritten from defaults,
    /// which also recovers from an unparsable file.
    pub fn init(defaults: &ConfigDefaults, force: bool) -> Result<InitOutcome, ConfigError> {
        let existing = io::read_optional_text(&defaults.config_path)?;

        let (config, wrote_config) = match existing {
            Some(content) if !force => (Self::parse(&content, defaults)?, false),
            _ => {
                let config = Self::from_defaults(defaults);
                config.save()?;
                (config, true)
            }
        };

        io::ensure_private_dir(&config.key_dir)?;
        match config.manifest_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => io::ensure_private_dir(parent)?,
            _ => {}
        }

        Ok(InitOutcome {
            config,
            wrote_config,
        })
    }
}

fn path_field(root: &Map<String, Value>, field: &str) -> Result<Option<PathBuf>, String> {
    match root.get(field) {
        None => Ok(None),
        Some(Value::String(raw)) => Ok(Some(expand_home(Path::new(raw)))),
        Some(_) => Err(format!("{field} must be a string")),
    }
}

fn parse_providers(value: &Value) -> Result<Vec<Provider>, String> {
    const SHAPE: &str = "allowed_providers must be a list of strings";

    let items = value.as_array().ok_or_else(|| SHAPE.to_string())?;
    let mut providers = Vec::with_capacity(items.len());
    let mut unknown = Vec::new();
    for item in items {
        let raw = item.as_str().ok_or_else(|| SHAPE.to_string())?;
        match raw.parse::<Provider>() {
            Ok(provider) => providers.push(provider),
            Err(_) => unknown.push(raw.to_string()),
        }
    }

    if !unknown.is_empty() {
        unknown.sort();
        return Err(format!("unknown providers: {}", unknown.join(", ")));
    }
    if providers.is_empty() {
        return Err("allowed_providers must not be empty".into());
    }
    Ok(providers)
}
