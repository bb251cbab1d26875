//! Key lifecycle: create, look up, read, delete, resident import
//!
//! Every operation re-reads the manifest; nothing is cached between calls.
//! Operations that touch a record's files resolve its paths through the
//! trust boundary first.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use keyward_fs::io;

use crate::config::Config;
use crate::error::{Error, ManifestError, Result};
use crate::keygen::{DEFAULT_ROUNDS, KeyGenerator, KeygenRequest};
use crate::manifest::{KeyKind, KeyRecord, ManifestStore, Provider};
use crate::openssh::PublicKeyLine;
use crate::reconcile::{
    DEFAULT_COMMENT_SUFFIX, PUBLIC_KEY_SUFFIX, ReconcileOutcome, RepairOptions, list_key_files,
    reconcile_with,
};
use crate::resolve::{canonical_key_dir, resolve_record_paths};

/// Everything needed to create one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateKeyRequest {
    pub name: String,
    pub provider: Provider,
    /// Defaults to `NAME@keyward`
    pub comment: Option<String>,
    pub passphrase: Option<String>,
    pub resident: bool,
    pub application: Option<String>,
    pub rounds: u32,
}

impl CreateKeyRequest {
    pub fn new(name: impl Into<String>, provider: Provider) -> Self {
        Self {
            name: name.into(),
            provider,
            comment: None,
            passphrase: None,
            resident: false,
            application: None,
            rounds: DEFAULT_ROUNDS,
        }
    }
}

/// Generate a key pair and record it in the manifest.
///
/// Policy is checked before anything touches the filesystem. Existing
/// `NAME` or `NAME.pub` files are never overwritten.
pub fn create_key(
    config: &Config,
    request: &CreateKeyRequest,
    generator: &dyn KeyGenerator,
) -> Result<KeyRecord> {
    let name = request.name.as_str();
    config.policy.validate(name, request.provider)?;

    let kind = match request.provider {
        Provider::HardwareBacked => KeyKind::HardwareBacked {
            resident: request.resident,
            application: request.application.clone(),
        },
        Provider::Software if request.resident || request.application.is_some() => {
            return Err(Error::InvalidRequest {
                message: "--resident and --application only apply to fido2 keys".into(),
            });
        }
        Provider::Software => KeyKind::Software,
    };

    let key_dir = canonical_key_dir(&config.key_dir)?;
    let private_key = key_dir.join(name);
    let public_key = key_dir.join(format!("{name}{PUBLIC_KEY_SUFFIX}"));
    // symlink_metadata so a dangling link still counts as taken
    if fs::symlink_metadata(&private_key).is_ok() || fs::symlink_metadata(&public_key).is_ok() {
        return Err(Error::KeyExists {
            name: name.to_string(),
        });
    }

    // A broken manifest must fail before key files appear
    let store = ManifestStore::new(&config.manifest_path);
    let mut records = store.load()?;

    io::ensure_private_dir(&key_dir)?;

    let comment = request
        .comment
        .clone()
        .unwrap_or_else(|| format!("{name}{DEFAULT_COMMENT_SUFFIX}"));
    generator.generate(&KeygenRequest {
        provider: request.provider,
        key_path: &private_key,
        comment: &comment,
        passphrase: request.passphrase.as_deref(),
        resident: request.resident,
        application: request.application.as_deref(),
        rounds: request.rounds,
    })?;

    let record = KeyRecord::new(name, kind, &public_key, &private_key, comment);
    if records.insert(name.to_string(), record.clone()).is_some() {
        tracing::info!(name, "replaced stale manifest entry");
    }
    store.save(&records)?;
    tracing::info!(name, provider = %request.provider, "key created");
    Ok(record)
}

/// Remove a key's files and its manifest entry.
///
/// Both paths are resolved before anything is removed; a record that fails
/// the trust boundary is left untouched and the error returned.
///
/// Removal is not transactional. The private file goes first; if the public
/// file then cannot be removed, [`ManifestError::RemoveFiles`] is returned
/// with the private file already gone and the manifest entry still in
/// place. A later scan reports the entry under missing files.
pub fn delete_key(config: &Config, name: &str) -> Result<KeyRecord> {
    let store = ManifestStore::new(&config.manifest_path);
    let mut records = store.load()?;
    let record = records.get(name).cloned().ok_or_else(|| Error::KeyNotFound {
        name: name.to_string(),
    })?;

    let paths = resolve_record_paths(&record, &config.key_dir)?;
    for path in [&paths.private_key, &paths.public_key] {
        remove_if_present(path).map_err(|e| ManifestError::RemoveFiles {
            name: name.to_string(),
            source: keyward_fs::Error::io(path, e),
        })?;
    }

    records.remove(name);
    store.save(&records)?;
    tracing::info!(name, "key deleted");
    Ok(record)
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// All records, ordered by name.
pub fn list_keys(config: &Config) -> Result<Vec<KeyRecord>> {
    let records = ManifestStore::new(&config.manifest_path).load()?;
    Ok(records.into_values().collect())
}

pub fn get_key(config: &Config, name: &str) -> Result<Option<KeyRecord>> {
    let mut records = ManifestStore::new(&config.manifest_path).load()?;
    Ok(records.remove(name))
}

/// Like [`get_key`], but a missing key is [`Error::KeyNotFound`].
pub fn require_key(config: &Config, name: &str) -> Result<KeyRecord> {
    get_key(config, name)?.ok_or_else(|| Error::KeyNotFound {
        name: name.to_string(),
    })
}

/// Public key line of `record`, trimmed.
pub fn read_public_key(config: &Config, record: &KeyRecord) -> Result<String> {
    let paths = resolve_record_paths(record, &config.key_dir)?;
    let content = io::read_text(&paths.public_key).map_err(|source| {
        ManifestError::ReadPublicKey {
            path: paths.public_key.clone(),
            source,
        }
    })?;
    Ok(content.trim().to_string())
}

/// `SHA256:` fingerprint of `record`'s public key, if the file holds a parsable key.
pub fn public_key_fingerprint(config: &Config, record: &KeyRecord) -> Result<Option<String>> {
    let line = read_public_key(config, record)?;
    Ok(PublicKeyLine::parse(&line).and_then(|parsed| parsed.fingerprint()))
}

/// `ssh_config` block that pins `host` to `record`'s identity.
///
/// The identity is the resolved absolute private key path, so a relative
/// manifest path does not end up relative to ssh's working directory.
pub fn ssh_config_snippet(config: &Config, record: &KeyRecord, host: &str) -> Result<String> {
    let paths = resolve_record_paths(record, &config.key_dir)?;
    Ok(render_ssh_config(host, &paths.private_key))
}

fn render_ssh_config(host: &str, identity: &Path) -> String {
    format!(
        "Host {host}\n  IdentityFile {}\n  IdentitiesOnly yes\n",
        identity.display()
    )
}

/// Download resident credentials from the authenticator and track them.
///
/// Pairs that appear in the key directory during the download are imported
/// as resident fido2 keys. Pairs that were already untracked beforehand are
/// imported too, with `resident` left unset. Existing files are never
/// overwritten by the import itself; `ssh-keygen -K` prompts before
/// replacing a file.
pub fn import_resident_keys(
    config: &Config,
    generator: &dyn KeyGenerator,
) -> Result<ReconcileOutcome> {
    let key_dir = canonical_key_dir(&config.key_dir)?;
    io::ensure_private_dir(&key_dir)?;

    let existing = list_key_files(&key_dir)?;
    generator.download_resident(&key_dir)?;
    let downloaded: BTreeSet<String> = list_key_files(&key_dir)?
        .difference(&existing)
        .cloned()
        .collect();
    tracing::debug!(files = downloaded.len(), "resident credentials downloaded");

    let options = RepairOptions {
        import_untracked: true,
        ..RepairOptions::default()
    };
    let outcome = reconcile_with(config, options, |records, applied| {
        for imported in &applied.imported {
            let name = &imported.name;
            let fresh = downloaded.contains(name)
                || downloaded.contains(&format!("{name}{PUBLIC_KEY_SUFFIX}"));
            if !fresh {
                continue;
            }
            if let Some(KeyRecord {
                kind: KeyKind::HardwareBacked { resident, .. },
                ..
            }) = records.get_mut(name)
            {
                *resident = true;
            }
        }
    })?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_config_block_layout() {
        assert_eq!(
            render_ssh_config("github.com", Path::new("/keys/demo")),
            "Host github.com\n  IdentityFile /keys/demo\n  IdentitiesOnly yes\n"
        );
    }

    #[test]
    fn request_defaults() {
        let request = CreateKeyRequest::new("demo", Provider::Software);
        assert_eq!(request.rounds, DEFAULT_ROUNDS);
        assert!(!request.resident);
        assert_eq!(request.comment, None);
    }
}
