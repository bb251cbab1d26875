//! Drift computation
//!
//! Pairing is decided purely by name: private material lives in `NAME`, the
//! public half in `NAME.pub`, both directly in the key directory.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::report::{DriftReport, InvalidPathEntry, MissingFile, MissingFilesEntry};
use crate::error::ManifestError;
use crate::manifest::Records;
use crate::resolve::{canonical_key_dir, resolve_record_paths_in};

/// Suffix of the public half of a key pair
pub const PUBLIC_KEY_SUFFIX: &str = ".pub";

/// Compare `records` against the contents of `key_dir`.
///
/// Read-only: nothing on disk or in `records` changes, so two runs over the
/// same state yield identical reports.
///
/// # Errors
///
/// Only a failure to list the key directory itself is fatal
/// ([`ManifestError::Scan`]). Per-record problems land in the report.
pub fn compute_drift(key_dir: &Path, records: &Records) -> Result<DriftReport, ManifestError> {
    let root = canonical_key_dir(key_dir)?;

    let mut invalid: BTreeMap<String, String> = BTreeMap::new();
    let mut missing: BTreeMap<String, BTreeSet<MissingFile>> = BTreeMap::new();
    let mut referenced_public: HashSet<PathBuf> = HashSet::new();

    for (name, record) in records {
        let paths = match resolve_record_paths_in(record, &root) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::debug!(name = %name, error = %e, "manifest entry has invalid path");
                invalid.insert(name.clone(), e.to_string());
                continue;
            }
        };

        let mut absent = BTreeSet::new();
        if !paths.private_key.is_file() {
            absent.insert(MissingFile::Private);
        }
        if !paths.public_key.is_file() {
            absent.insert(MissingFile::Public);
        }
        if !absent.is_empty() {
            missing.insert(name.clone(), absent);
        }
        referenced_public.insert(paths.public_key);
    }

    let files = list_key_files(&root)?;

    let mut untracked = BTreeSet::new();
    let mut orphan_public = BTreeSet::new();
    let mut orphan_private = BTreeSet::new();

    for file in &files {
        match public_key_stem(file) {
            Some(stem) if files.contains(stem) => {
                if !records.contains_key(stem) {
                    untracked.insert(stem.to_string());
                }
            }
            Some(_) => {
                orphan_public.insert(file.clone());
            }
            None => {
                let public_sibling = format!("{file}{PUBLIC_KEY_SUFFIX}");
                if files.contains(&public_sibling) || referenced_public.contains(&root.join(file))
                {
                    continue;
                }
                orphan_private.insert(file.clone());
            }
        }
    }

    let report = DriftReport {
        invalid_manifest_paths: invalid
            .into_iter()
            .map(|(name, error)| InvalidPathEntry { name, error })
            .collect(),
        manifest_entries_missing_files: missing
            .into_iter()
            .map(|(name, missing)| MissingFilesEntry {
                name,
                missing: missing.into_iter().collect(),
            })
            .collect(),
        key_dir_untracked_pairs: untracked.into_iter().collect(),
        key_dir_orphan_public_keys: orphan_public.into_iter().collect(),
        key_dir_orphan_private_keys: orphan_private.into_iter().collect(),
    };

    tracing::debug!(
        key_dir = %root.display(),
        files = files.len(),
        issues = report.issue_count(),
        "drift computed"
    );
    Ok(report)
}

/// `demo.pub` -> `demo`; `.pub` and non-public names -> `None`
fn public_key_stem(file: &str) -> Option<&str> {
    file.strip_suffix(PUBLIC_KEY_SUFFIX)
        .filter(|stem| !stem.is_empty())
}

/// Regular, visible, UTF-8 named files directly inside `root`.
///
/// A missing directory lists as empty. Entries that vanish mid-scan are
/// skipped rather than failing the run.
pub(crate) fn list_key_files(root: &Path) -> Result<BTreeSet<String>, ManifestError> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(source) => {
            return Err(ManifestError::Scan {
                path: root.to_path_buf(),
                source,
            });
        }
    };

    let mut files = BTreeSet::new();
    for entry in entries {
        let Ok(entry) = entry else {
            continue;
        };
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            tracing::warn!(
                entry = %entry.path().display(),
                "skipping key dir entry with non-UTF-8 name"
            );
            continue;
        };
        // Hidden entries include the atomic writer's temp and lock files
        if name.starts_with('.') {
            continue;
        }
        // Follows symlinks, so a link to a regular file counts as a file
        if !entry.path().is_file() {
            continue;
        }
        files.insert(name.to_string());
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_stem_requires_a_name() {
        assert_eq!(public_key_stem("demo.pub"), Some("demo"));
        assert_eq!(public_key_stem("a.b.pub"), Some("a.b"));
        assert_eq!(public_key_stem(".pub"), None);
        assert_eq!(public_key_stem("demo"), None);
        assert_eq!(public_key_stem("demo.pubkey"), None);
    }

    #[test]
    fn missing_key_dir_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = list_key_files(&dir.path().join("absent")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn listing_skips_hidden_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("demo"), "x").unwrap();
        fs::write(dir.path().join(".keys.json.lock"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        let files = list_key_files(dir.path()).unwrap();
        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["demo".to_string()]);
    }
}
