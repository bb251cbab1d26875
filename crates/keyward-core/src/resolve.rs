//! Trust boundary for manifest-declared paths
//!
//! Record path fields are untrusted: the manifest is a plain file that can be
//! edited by hand. Every consumer that reads, deletes or stats a record's
//! files goes through [`resolve_record_paths`] (or [`resolve_within`]) first,
//! and acts only on the returned absolute paths.

use std::path::{Path, PathBuf};

use keyward_fs::{expand_home, resolve_lenient};

use crate::error::ManifestError;
use crate::manifest::KeyRecord;

/// Canonical form of the key directory used as the trust root.
///
/// Symlinks in the key directory path itself are followed, so a key dir
/// reached through a link still contains the files it links to.
pub fn canonical_key_dir(key_dir: &Path) -> Result<PathBuf, ManifestError> {
    Ok(resolve_lenient(&expand_home(key_dir))?)
}

/// Resolve `declared` against `key_dir` and prove it stays inside.
///
/// Relative paths are taken relative to `key_dir`; absolute paths are
/// accepted only if they resolve inside it. `..` segments and symlinks are
/// resolved before the check. The target does not have to exist.
///
/// # Errors
///
/// [`ManifestError::OutsideKeyDir`] when the resolved path is not strictly
/// below the key directory, [`ManifestError::Unresolvable`] when resolution
/// itself fails (e.g. a symlink loop).
pub fn resolve_within(declared: &str, key_dir: &Path) -> Result<PathBuf, ManifestError> {
    let root = canonical_key_dir(key_dir)?;
    resolve_in(declared, &root, "path")
}

/// Both files of a record, resolved inside the key directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

/// Resolve both path fields of `record`; the first escaping field wins.
pub fn resolve_record_paths(
    record: &KeyRecord,
    key_dir: &Path,
) -> Result<ResolvedPaths, ManifestError> {
    let root = canonical_key_dir(key_dir)?;
    resolve_record_paths_in(record, &root)
}

/// Like [`resolve_record_paths`] with an already canonical root.
pub(crate) fn resolve_record_paths_in(
    record: &KeyRecord,
    root: &Path,
) -> Result<ResolvedPaths, ManifestError> {
    Ok(ResolvedPaths {
        private_key: resolve_in(&record.private_key_path, root, "private_key_path")?,
        public_key: resolve_in(&record.public_key_path, root, "public_key_path")?,
    })
}

/// Resolve one declared path against an already canonical root.
pub(crate) fn resolve_in(
    declared: &str,
    root: &Path,
    field: &'static str,
) -> Result<PathBuf, ManifestError> {
    let expanded = expand_home(Path::new(declared));
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        root.join(expanded)
    };

    let resolved = resolve_lenient(&joined).map_err(|source| ManifestError::Unresolvable {
        field,
        declared: declared.to_string(),
        source,
    })?;

    // The key dir itself is not a key file
    if resolved == root || !resolved.starts_with(root) {
        return Err(ManifestError::OutsideKeyDir {
            field,
            declared: declared.to_string(),
            key_dir: root.to_path_buf(),
        });
    }

    tracing::debug!(field, declared, resolved = %resolved.display(), "resolved manifest path");
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_declared_path_is_the_root_and_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_within("", dir.path()).unwrap_err();
        assert!(err.is_outside_key_dir());
    }

    #[test]
    fn prefix_sibling_is_not_inside() {
        let dir = tempfile::tempdir().unwrap();
        let keys = dir.path().join("keys");
        let sibling = dir.path().join("keys-evil").join("demo");
        let err = resolve_within(&sibling.to_string_lossy(), &keys).unwrap_err();
        assert!(err.is_outside_key_dir());
    }
}
