//! Error types for keyward-core

use std::path::PathBuf;

use crate::config::PolicyError;

/// Result type for keyward-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed or policy-violating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file is not valid JSON
    #[error("Invalid JSON in config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Config file parsed but a field has the wrong shape
    #[error("Invalid config {path}: {message}")]
    Schema { path: PathBuf, message: String },

    /// Policy fields are inconsistent (unknown provider, empty allow-list, bad regex)
    #[error("Invalid policy: {0}")]
    Policy(String),

    /// Platform directories could not be determined
    #[error("Could not determine the {what} directory for this platform")]
    NoPlatformDir { what: &'static str },

    #[error(transparent)]
    Fs(#[from] keyward_fs::Error),
}

/// Malformed manifest, trust-boundary violation, or I/O failure on manifest data
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Manifest file is not valid JSON
    #[error("Invalid JSON in manifest file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Manifest root or `keys` has the wrong shape
    #[error("Invalid manifest schema: {path} ({message})")]
    Schema { path: PathBuf, message: String },

    /// A single entry is malformed
    #[error("Invalid manifest schema: {path} (entry '{entry}': {message})")]
    Entry {
        path: PathBuf,
        entry: String,
        message: String,
    },

    #[error("Unsupported manifest version {version} in {path}")]
    UnsupportedVersion { path: PathBuf, version: u64 },

    /// A declared path resolves outside the key directory
    #[error("Invalid manifest entry: {field} '{declared}' is outside key dir '{key_dir}'")]
    OutsideKeyDir {
        field: &'static str,
        declared: String,
        key_dir: PathBuf,
    },

    /// A declared path could not be resolved at all (e.g. a symlink loop)
    #[error("Invalid manifest entry: {field} '{declared}' could not be resolved: {source}")]
    Unresolvable {
        field: &'static str,
        declared: String,
        #[source]
        source: keyward_fs::Error,
    },

    /// The key directory itself could not be listed
    #[error("Failed to scan key directory {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove key files for {name}: {source}")]
    RemoveFiles {
        name: String,
        #[source]
        source: keyward_fs::Error,
    },

    #[error("Failed to read public key file: {path}")]
    ReadPublicKey {
        path: PathBuf,
        #[source]
        source: keyward_fs::Error,
    },

    #[error(transparent)]
    Fs(#[from] keyward_fs::Error),
}

impl ManifestError {
    /// Whether this error is the trust-boundary rejection.
    ///
    /// Lets callers tell "this path was blocked" apart from "this file is
    /// not there".
    pub fn is_outside_key_dir(&self) -> bool {
        matches!(self, Self::OutsideKeyDir { .. })
    }

    /// The manifest entry this error names, if any.
    pub fn entry(&self) -> Option<&str> {
        match self {
            Self::Entry { entry, .. } => Some(entry),
            Self::RemoveFiles { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Errors from key lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("Key files already exist for {name}.")]
    KeyExists { name: String },

    #[error("Key not found: {name}")]
    KeyNotFound { name: String },

    /// Request is internally inconsistent (e.g. a resident software key)
    #[error("{message}")]
    InvalidRequest { message: String },

    /// The external key generator failed; surfaced as reported
    #[error("{program} failed{}: {message}", .code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    Keygen {
        program: String,
        code: Option<i32>,
        message: String,
    },

    #[error(transparent)]
    Fs(#[from] keyward_fs::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
