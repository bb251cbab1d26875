//! Manifest integrity and drift reconciliation for keyward
//!
//! This crate owns everything between the command line and the filesystem:
//!
//! - **Manifest store**: versioned JSON record collection with per-entry diagnostics
//! - **Trust boundary**: every manifest-declared path is proven to lie inside the key directory
//! - **Policy**: provider allow-list and anchored key-name pattern
//! - **Drift reconciliation**: five-way classification of manifest/key-dir differences and
//!   explicit, confirmable repairs
//! - **Key lifecycle**: create, delete, inspect and import keys through an external generator
//!
//! # Architecture
//!
//! ```text
//!                  keyward-cli
//!                       |
//!                 keyward-core
//!      +--------+-------+--------+----------+
//!      |        |       |        |          |
//!   config  manifest  resolve  reconcile  keys/keygen
//!                       |
//!                  keyward-fs
//! ```
//!
//! Every operation takes an explicit [`Config`]; platform directories are only
//! consulted by [`ConfigDefaults::platform`].
//!
//! # Example
//!
//! ```no_run
//! use keyward_core::{Config, ConfigDefaults, scan};
//!
//! fn check() -> keyward_core::Result<bool> {
//!     let config = Config::load(&ConfigDefaults::platform()?)?;
//!     Ok(scan(&config)?.is_clean())
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod keygen;
pub mod keys;
pub mod manifest;
pub mod openssh;
pub mod reconcile;
pub mod resolve;

pub use config::{
    APP_NAME, Config, ConfigDefaults, DEFAULT_NAME_PATTERN, InitOutcome, Policy, PolicyError,
};
pub use error::{ConfigError, Error, ManifestError, Result};
pub use export::{ExportFormat, export_keys, render_export};
pub use keygen::{
    Capability, DEFAULT_ROUNDS, KeyGenerator, KeygenRequest, SshKeygen, fido2_capability,
    probe_keygen, ssh_version,
};
pub use keys::{
    CreateKeyRequest, create_key, delete_key, get_key, import_resident_keys, list_keys,
    public_key_fingerprint, read_public_key, require_key, ssh_config_snippet,
};
pub use manifest::{
    KeyKind, KeyRecord, MANIFEST_VERSION, ManifestStore, Provider, Records, load_manifest,
    save_manifest,
};
pub use openssh::{PublicKeyLine, fingerprint};
pub use reconcile::{
    AppliedActions, DriftReport, ImportedKey, InvalidPathEntry, MissingFile, MissingFilesEntry,
    RECONSTRUCTED_CREATED_AT_NOTE, ReconcileOutcome, RepairOptions, SkippedImport, apply_repairs,
    compute_drift, reconcile, scan,
};
pub use resolve::{ResolvedPaths, canonical_key_dir, resolve_record_paths, resolve_within};
