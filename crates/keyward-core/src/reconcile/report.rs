//! Drift report types
//!
//! A [`DriftReport`] is computed fresh on every run and never persisted. All
//! lists are sorted and deduplicated so JSON output is stable.

use serde::{Deserialize, Serialize};

/// Which file of a tracked pair is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFile {
    Private,
    Public,
}

/// A manifest entry whose files are (partly) absent
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MissingFilesEntry {
    pub name: String,
    pub missing: Vec<MissingFile>,
}

/// A manifest entry whose paths failed the trust boundary
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InvalidPathEntry {
    pub name: String,
    pub error: String,
}

/// Differences between the manifest and the key directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    /// Entries whose declared paths escape the key dir or cannot be resolved
    pub invalid_manifest_paths: Vec<InvalidPathEntry>,
    /// Entries with a resolved private and/or public file that does not exist
    pub manifest_entries_missing_files: Vec<MissingFilesEntry>,
    /// Stems with both `NAME` and `NAME.pub` present but no manifest entry
    pub key_dir_untracked_pairs: Vec<String>,
    /// `NAME.pub` files without a `NAME` sibling
    pub key_dir_orphan_public_keys: Vec<String>,
    /// Files without a `.pub` sibling that no entry references
    pub key_dir_orphan_private_keys: Vec<String>,
}

impl DriftReport {
    /// No drift in any category
    pub fn is_clean(&self) -> bool {
        self.issue_count() == 0
    }

    pub fn issue_count(&self) -> usize {
        self.invalid_manifest_paths.len()
            + self.manifest_entries_missing_files.len()
            + self.key_dir_untracked_pairs.len()
            + self.key_dir_orphan_public_keys.len()
            + self.key_dir_orphan_private_keys.len()
    }
}
