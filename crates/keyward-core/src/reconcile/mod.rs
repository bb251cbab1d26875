//! Drift reconciliation between the manifest and the key directory
//!
//! [`compute_drift`] classifies discrepancies into five disjoint categories;
//! [`apply_repairs`] turns selected categories into record changes. The
//! [`reconcile`] entry point ties them to the manifest file and always
//! recomputes after writing, so callers see the state that is actually on
//! disk rather than what the repair intended.

mod apply;
mod compute;
mod report;

pub use apply::{
    AppliedActions, DEFAULT_COMMENT_SUFFIX, ImportedKey, RECONSTRUCTED_CREATED_AT_NOTE,
    RepairOptions, SkippedImport, apply_repairs,
};
pub use compute::{PUBLIC_KEY_SUFFIX, compute_drift};
pub use report::{DriftReport, InvalidPathEntry, MissingFile, MissingFilesEntry};

pub(crate) use compute::list_key_files;

use serde::Serialize;

use crate::config::Config;
use crate::error::ManifestError;
use crate::manifest::{ManifestStore, Records};

/// Result of a [`reconcile`] run
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    /// Drift before any repair
    pub before: DriftReport,
    pub applied: AppliedActions,
    /// Drift recomputed from the persisted manifest
    pub report: DriftReport,
    /// Whether the manifest file was rewritten
    pub saved: bool,
}

/// Compute drift for the configured key directory and manifest.
pub fn scan(config: &Config) -> Result<DriftReport, ManifestError> {
    let records = ManifestStore::new(&config.manifest_path).load()?;
    compute_drift(&config.key_dir, &records)
}

/// Load, compute, repair, persist, and recompute.
///
/// The manifest is only rewritten when a repair changed the mapping.
pub fn reconcile(config: &Config, options: RepairOptions) -> Result<ReconcileOutcome, ManifestError> {
    reconcile_with(config, options, |_, _| {})
}

/// [`reconcile`] with a hook that may adjust repaired records before they are saved.
pub(crate) fn reconcile_with(
    config: &Config,
    options: RepairOptions,
    adjust: impl FnOnce(&mut Records, &AppliedActions),
) -> Result<ReconcileOutcome, ManifestError> {
    let store = ManifestStore::new(&config.manifest_path);
    let records = store.load()?;
    let before = compute_drift(&config.key_dir, &records)?;

    let (mut updated, applied) = apply_repairs(&before, &config.key_dir, &records, options)?;
    let saved = applied.changed();
    if saved {
        adjust(&mut updated, &applied);
        store.save(&updated)?;
        tracing::info!(
            imported = applied.imported.len(),
            pruned_missing = applied.pruned_missing.len(),
            pruned_invalid = applied.pruned_invalid.len(),
            "repairs applied"
        );
    }

    let report = compute_drift(&config.key_dir, &store.load()?)?;
    Ok(ReconcileOutcome {
        before,
        applied,
        report,
        saved,
    })
}
