//! Manifest data model and persistence
//!
//! The manifest maps key names to [`KeyRecord`]s and is persisted as a
//! single versioned JSON file. The file on disk is the source of truth:
//! every operation re-reads it, and every mutation rewrites it whole.

mod record;
mod store;

pub use record::{KeyKind, KeyRecord, Provider};
pub use store::{MANIFEST_VERSION, ManifestStore, Records, load_manifest, save_manifest};
