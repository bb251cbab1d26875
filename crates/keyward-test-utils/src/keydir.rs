//! [`TestKeyDir`] builder for key directory scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;

use crate::keys;

/// A temporary tree holding a key directory, a config directory and a fake
/// home directory.
///
/// ```text
/// <tmp>/keys/                      key dir
/// <tmp>/config/keyward/keys.json   manifest
/// <tmp>/config/keyward/config.json config file
/// <tmp>/home/
/// ```
///
/// Nothing is created under `keys/` or `config/` until a helper writes there.
///
/// # Example
///
/// ```rust,no_run
/// use keyward_test_utils::TestKeyDir;
///
/// let dir = TestKeyDir::new();
/// dir.write_ed25519_pair("demo");
/// dir.assert_file_exists("demo.pub");
/// ```
pub struct TestKeyDir {
    temp_dir: TempDir,
}

impl Default for TestKeyDir {
    fn default() -> Self {
        Self::new()
    }
}

impl TestKeyDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn key_dir(&self) -> PathBuf {
        self.root().join("keys")
    }

    /// Platform-style config directory (parent of `keyward/`)
    pub fn config_dir(&self) -> PathBuf {
        self.root().join("config")
    }

    pub fn home(&self) -> PathBuf {
        self.root().join("home")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.config_dir().join("keyward").join("keys.json")
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir().join("keyward").join("config.json")
    }

    /// Path of `name` inside the key dir.
    pub fn key_path(&self, name: &str) -> PathBuf {
        self.key_dir().join(name)
    }

    /// Write `content` to `relative` inside the key dir, creating parents.
    pub fn write_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.key_path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn write_private(&self, name: &str) -> PathBuf {
        self.write_file(name, keys::PRIVATE_KEY)
    }

    pub fn write_public(&self, name: &str, line: &str) -> PathBuf {
        self.write_file(&format!("{name}.pub"), line)
    }

    /// Write `name` and `name.pub` with the given public key line.
    pub fn write_pair(&self, name: &str, public_line: &str) {
        self.write_private(name);
        self.write_public(name, public_line);
    }

    pub fn write_ed25519_pair(&self, name: &str) {
        self.write_pair(name, &keys::ed25519_line(&format!("{name}@test")));
    }

    pub fn write_sk_pair(&self, name: &str) {
        self.write_pair(name, &keys::sk_line(&format!("{name}@test")));
    }

    /// A manifest entry pointing at `name`/`name.pub` in the key dir.
    pub fn record_json(&self, name: &str, provider: &str) -> Value {
        self.record_json_with_paths(
            name,
            provider,
            &self.key_path(&format!("{name}.pub")).to_string_lossy(),
            &self.key_path(name).to_string_lossy(),
        )
    }

    /// A manifest entry with explicit (possibly hostile) path fields.
    pub fn record_json_with_paths(
        &self,
        name: &str,
        provider: &str,
        public_key_path: &str,
        private_key_path: &str,
    ) -> Value {
        json!({
            "application": null,
            "comment": format!("{name}@test"),
            "created_at": "2024-01-01T00:00:00Z",
            "name": name,
            "private_key_path": private_key_path,
            "provider": provider,
            "public_key_path": public_key_path,
            "resident": false,
        })
    }

    /// Write a version 1 manifest holding `entries`.
    pub fn write_manifest(&self, entries: impl IntoIterator<Item = Value>) {
        let keys: serde_json::Map<String, Value> = entries
            .into_iter()
            .map(|entry| {
                let name = entry["name"].as_str().unwrap().to_string();
                (name, entry)
            })
            .collect();
        self.write_manifest_json(&json!({ "version": 1, "keys": keys }));
    }

    pub fn write_manifest_json(&self, value: &Value) {
        self.write_manifest_raw(&serde_json::to_string_pretty(value).unwrap());
    }

    pub fn write_manifest_raw(&self, content: &str) {
        let path = self.manifest_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn read_manifest_json(&self) -> Value {
        serde_json::from_str(&fs::read_to_string(self.manifest_path()).unwrap()).unwrap()
    }

    /// Names under `keys` in the manifest, sorted.
    pub fn manifest_names(&self) -> Vec<String> {
        let manifest = self.read_manifest_json();
        let mut names: Vec<String> = manifest["keys"]
            .as_object()
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Write a config file pointing at this tree's key dir and manifest,
    /// merged with `extra` fields.
    pub fn write_config(&self, extra: Value) {
        let mut config = json!({
            "key_dir": self.key_dir().to_string_lossy(),
            "manifest_path": self.manifest_path().to_string_lossy(),
        });
        if let (Some(base), Value::Object(extra)) = (config.as_object_mut(), extra) {
            base.extend(extra);
        }
        let path = self.config_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    }

    /// Assert that `relative` exists inside the key dir.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, relative: &str) {
        let path = self.key_path(relative);
        assert!(path.exists(), "Expected file to exist: {}", path.display());
    }

    /// Assert that `relative` does **not** exist inside the key dir.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_absent(&self, relative: &str) {
        let path = self.key_path(relative);
        assert!(!path.exists(), "Expected file to be absent: {}", path.display());
    }
}
