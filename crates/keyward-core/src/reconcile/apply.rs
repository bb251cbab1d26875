//! Safe, explicit repairs derived from a [`DriftReport`]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::compute::PUBLIC_KEY_SUFFIX;
use super::report::DriftReport;
use crate::error::ManifestError;
use crate::manifest::{KeyKind, KeyRecord, Provider, Records};
use crate::openssh::PublicKeyLine;
use crate::resolve::{canonical_key_dir, resolve_in};

/// Comment given to imported keys whose public key line has none
pub const DEFAULT_COMMENT_SUFFIX: &str = "@keyward";

/// Caveat attached to every imported key's timestamp
pub const RECONSTRUCTED_CREATED_AT_NOTE: &str =
    "created_at of imported keys is reconstructed from the public key file's modification time, not the original creation time";

/// Which repairs to perform. Nothing happens unless asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairOptions {
    /// Add manifest entries for untracked `NAME`/`NAME.pub` pairs
    pub import_untracked: bool,
    /// Drop entries whose files are missing
    pub prune_missing: bool,
    /// Drop entries whose paths fail the trust boundary
    pub prune_invalid: bool,
    /// Confirmation for destructive prunes
    pub proceed: bool,
}

impl RepairOptions {
    pub fn requests_prune(&self) -> bool {
        self.prune_missing || self.prune_invalid
    }

    pub fn requests_any(&self) -> bool {
        self.import_untracked || self.requests_prune()
    }
}

/// A record synthesized from an untracked pair.
///
/// `created_at` is the public key file's modification time: a best-effort
/// reconstruction, not a recorded creation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedKey {
    pub name: String,
    pub provider: Provider,
    pub key_type: String,
    pub created_at: DateTime<Utc>,
}

/// An untracked pair that could not be imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedImport {
    pub name: String,
    pub error: String,
}

/// What [`apply_repairs`] did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppliedActions {
    pub imported: Vec<ImportedKey>,
    pub skipped_imports: Vec<SkippedImport>,
    pub pruned_missing: Vec<String>,
    pub pruned_invalid: Vec<String>,
    /// Prunes that were requested but not confirmed
    pub unconfirmed: Vec<String>,
}

impl AppliedActions {
    /// Whether the record mapping differs from the input
    pub fn changed(&self) -> bool {
        !self.imported.is_empty() || !self.pruned_missing.is_empty() || !self.pruned_invalid.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
enum ImportError {
    #[error("already tracked in manifest")]
    AlreadyTracked,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no public key line in {path}")]
    NoKeyLine { path: PathBuf },

    #[error(transparent)]
    Boundary(#[from] ManifestError),
}

/// Apply the repairs selected by `options` to a copy of `records`.
///
/// Imports never abort the batch: a pair that cannot be read or parsed, or
/// whose files link out of the key directory, is reported in
/// [`AppliedActions::skipped_imports`]. Prunes run only when
/// `options.proceed` is set; otherwise the affected names are reported as
/// unconfirmed. Nothing is written to disk here.
pub fn apply_repairs(
    report: &DriftReport,
    key_dir: &Path,
    records: &Records,
    options: RepairOptions,
) -> Result<(Records, AppliedActions), ManifestError> {
    let root = canonical_key_dir(key_dir)?;
    let mut updated = records.clone();
    let mut actions = AppliedActions::default();

    if options.import_untracked {
        for name in &report.key_dir_untracked_pairs {
            let result = if updated.contains_key(name) {
                Err(ImportError::AlreadyTracked)
            } else {
                import_pair(&root, name)
            };
            match result {
                Ok((record, imported)) => {
                    tracing::info!(name = %name, provider = %imported.provider, "imported untracked key pair");
                    updated.insert(name.clone(), record);
                    actions.imported.push(imported);
                }
                Err(e) => {
                    tracing::debug!(name = %name, error = %e, "skipped import");
                    actions.skipped_imports.push(SkippedImport {
                        name: name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    if options.prune_missing {
        let names = report.manifest_entries_missing_files.iter().map(|e| &e.name);
        prune(&mut updated, names, options.proceed, &mut actions.pruned_missing, &mut actions.unconfirmed);
    }
    if options.prune_invalid {
        let names = report.invalid_manifest_paths.iter().map(|e| &e.name);
        prune(&mut updated, names, options.proceed, &mut actions.pruned_invalid, &mut actions.unconfirmed);
    }
    actions.unconfirmed.sort();
    actions.unconfirmed.dedup();

    Ok((updated, actions))
}

fn prune<'a>(
    records: &mut Records,
    names: impl Iterator<Item = &'a String>,
    proceed: bool,
    pruned: &mut Vec<String>,
    unconfirmed: &mut Vec<String>,
) {
    for name in names {
        if !proceed {
            unconfirmed.push(name.clone());
        } else if records.remove(name).is_some() {
            tracing::info!(name = %name, "pruned manifest entry");
            pruned.push(name.clone());
        }
    }
}

fn import_pair(root: &Path, name: &str) -> Result<(KeyRecord, ImportedKey), ImportError> {
    let private_path = root.join(name);
    let public_path = root.join(format!("{name}{PUBLIC_KEY_SUFFIX}"));
    // Either file may be a symlink out of the key dir
    resolve_in(&private_path.to_string_lossy(), root, "private_key_path")?;
    let public_target = resolve_in(&public_path.to_string_lossy(), root, "public_key_path")?;

    let content = fs::read_to_string(&public_target).map_err(|source| ImportError::Read {
        path: public_path.clone(),
        source,
    })?;
    let line = PublicKeyLine::parse(&content).ok_or_else(|| ImportError::NoKeyLine {
        path: public_path.clone(),
    })?;

    let kind = if line.is_hardware_backed() {
        KeyKind::HardwareBacked {
            resident: false,
            application: line.application(),
        }
    } else {
        KeyKind::Software
    };
    let comment = line
        .comment
        .clone()
        .unwrap_or_else(|| format!("{name}{DEFAULT_COMMENT_SUFFIX}"));
    let created_at = modified_time(&public_target);

    let record = KeyRecord::new(name, kind, &public_path, &private_path, comment)
        .with_created_at(created_at);
    let imported = ImportedKey {
        name: name.to_string(),
        provider: record.provider(),
        key_type: line.key_type,
        created_at,
    };
    Ok((record, imported))
}

/// Modification time of `path`, or now when the platform cannot report it
fn modified_time(path: &Path) -> DateTime<Utc> {
    match fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(time) => DateTime::<Utc>::from(time),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "no mtime, using current time");
            Utc::now()
        }
    }
}
