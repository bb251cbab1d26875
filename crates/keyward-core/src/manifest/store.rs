//! Manifest (de)serialization with schema validation

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use keyward_fs::io;
use serde::Serialize;
use serde_json::Value;

use super::KeyRecord;
use crate::error::ManifestError;

/// Current manifest format version
pub const MANIFEST_VERSION: u64 = 1;

/// Manifest records keyed by name; ordered for deterministic output
pub type Records = BTreeMap<String, KeyRecord>;

/// On-disk layout; field order keeps the written keys sorted
#[derive(Serialize)]
struct ManifestFile<'a> {
    keys: &'a Records,
    version: u64,
}

/// Loads and saves the manifest at a fixed path.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all records.
    ///
    /// A missing file is the legitimate empty state and yields no records.
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError`] naming the offending entry where possible
    /// when the file is not JSON, the root or `keys` is not an object, an
    /// entry is malformed, or an entry's key differs from its `name`.
    pub fn load(&self) -> Result<Records, ManifestError> {
        let Some(content) = io::read_optional_text(&self.path)? else {
            tracing::debug!(path = %self.path.display(), "manifest not found, starting empty");
            return Ok(Records::new());
        };
        self.parse(&content)
    }

    /// Persist all records as a complete rewrite through the atomic writer.
    pub fn save(&self, records: &Records) -> Result<(), ManifestError> {
        io::write_private_json(
            &self.path,
            &ManifestFile {
                keys: records,
                version: MANIFEST_VERSION,
            },
        )?;
        tracing::info!(path = %self.path.display(), keys = records.len(), "manifest saved");
        Ok(())
    }

    fn parse(&self, content: &str) -> Result<Records, ManifestError> {
        let data: Value = serde_json::from_str(content).map_err(|e| ManifestError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let Value::Object(root) = data else {
            return Err(self.schema_error("expected object root"));
        };

        match root.get("version") {
            None => {}
            Some(version) => match version.as_u64() {
                Some(MANIFEST_VERSION) => {}
                Some(other) => {
                    return Err(ManifestError::UnsupportedVersion {
                        path: self.path.clone(),
                        version: other,
                    });
                }
                None => return Err(self.schema_error("version must be an integer")),
            },
        }

        let keys = match root.get("keys") {
            None => return Ok(Records::new()),
            Some(Value::Object(keys)) => keys,
            Some(_) => return Err(self.schema_error("keys must be an object")),
        };

        let mut records = Records::new();
        for (name, payload) in keys {
            if !payload.is_object() {
                return Err(self.entry_error(name, "must be an object"));
            }
            let record: KeyRecord = serde_json::from_value(payload.clone())
                .map_err(|e| self.entry_error(name, e.to_string()))?;
            if record.name != *name {
                return Err(self.entry_error(
                    name,
                    format!("name field '{}' does not match manifest key", record.name),
                ));
            }
            records.insert(name.clone(), record);
        }
        Ok(records)
    }

    fn schema_error(&self, message: &str) -> ManifestError {
        ManifestError::Schema {
            path: self.path.clone(),
            message: message.to_string(),
        }
    }

    fn entry_error(&self, entry: &str, message: impl Into<String>) -> ManifestError {
        ManifestError::Entry {
            path: self.path.clone(),
            entry: entry.to_string(),
            message: message.into(),
        }
    }
}

/// Load the manifest at `path`; see [`ManifestStore::load`].
pub fn load_manifest(path: &Path) -> Result<Records, ManifestError> {
    ManifestStore::new(path).load()
}

/// Save `records` to `path`; see [`ManifestStore::save`].
pub fn save_manifest(path: &Path, records: &Records) -> Result<(), ManifestError> {
    ManifestStore::new(path).save(records)
}
