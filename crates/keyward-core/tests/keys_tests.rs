//! Tests for the key lifecycle operations

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use keyward_core::{
    Config, CreateKeyRequest, Error, KeyGenerator, KeyKind, KeygenRequest, Policy, Provider,
    Result, create_key, delete_key, get_key, import_resident_keys, list_keys,
    public_key_fingerprint, read_public_key, require_key, ssh_config_snippet,
};
use keyward_test_utils::TestKeyDir;
use keyward_test_utils::keys::{self, ED25519_FINGERPRINT};
use pretty_assertions::assert_eq;

/// Writes key files the way `ssh-keygen` would, and remembers what it was asked
#[derive(Default)]
struct FakeKeygen {
    generated: RefCell<Vec<(Provider, PathBuf, String, Option<String>)>>,
    resident_names: Vec<&'static str>,
    fail: bool,
}

impl KeyGenerator for FakeKeygen {
    fn generate(&self, request: &KeygenRequest<'_>) -> Result<()> {
        if self.fail {
            return Err(Error::Keygen {
                program: "fake-keygen".into(),
                code: Some(255),
                message: "device not found".into(),
            });
        }
        let line = match request.provider {
            Provider::HardwareBacked => keys::sk_line(request.comment),
            Provider::Software => keys::ed25519_line(request.comment),
        };
        fs::write(request.key_path, keys::PRIVATE_KEY).unwrap();
        fs::write(format!("{}.pub", request.key_path.display()), line).unwrap();
        self.generated.borrow_mut().push((
            request.provider,
            request.key_path.to_path_buf(),
            request.comment.to_string(),
            request.passphrase.map(str::to_string),
        ));
        Ok(())
    }

    fn download_resident(&self, dir: &Path) -> Result<()> {
        for name in &self.resident_names {
            fs::write(dir.join(name), keys::PRIVATE_KEY).unwrap();
            fs::write(dir.join(format!("{name}.pub")), keys::sk_line("resident")).unwrap();
        }
        Ok(())
    }
}

fn config(dir: &TestKeyDir) -> Config {
    Config {
        config_path: dir.config_path(),
        key_dir: dir.key_dir(),
        manifest_path: dir.manifest_path(),
        policy: Policy::default(),
    }
}

#[test]
fn test_create_records_key() {
    let dir = TestKeyDir::new();
    let keygen = FakeKeygen::default();
    let mut request = CreateKeyRequest::new("work", Provider::Software);
    request.passphrase = Some("hunter2".into());

    let record = create_key(&config(&dir), &request, &keygen).unwrap();

    assert_eq!(record.name, "work");
    assert_eq!(record.comment, "work@keyward");
    assert_eq!(record.kind, KeyKind::Software);
    dir.assert_file_exists("work");
    dir.assert_file_exists("work.pub");
    assert_eq!(dir.manifest_names(), vec!["work"]);

    let generated = keygen.generated.borrow();
    assert_eq!(generated.len(), 1);
    assert_eq!(generated[0].2, "work@keyward");
    assert_eq!(generated[0].3.as_deref(), Some("hunter2"));
}

#[test]
fn test_create_hardware_key_keeps_options() {
    let dir = TestKeyDir::new();
    let mut request = CreateKeyRequest::new("yubi", Provider::HardwareBacked);
    request.resident = true;
    request.application = Some("ssh:yubi".into());
    request.comment = Some("me@laptop".into());

    let record = create_key(&config(&dir), &request, &FakeKeygen::default()).unwrap();
    assert!(record.is_resident());
    assert_eq!(record.application(), Some("ssh:yubi"));

    let manifest = dir.read_manifest_json();
    assert_eq!(manifest["keys"]["yubi"]["provider"], "fido2");
    assert_eq!(manifest["keys"]["yubi"]["resident"], true);
    assert_eq!(manifest["keys"]["yubi"]["comment"], "me@laptop");
}

#[test]
fn test_policy_failure_has_no_filesystem_effect() {
    let dir = TestKeyDir::new();
    let keygen = FakeKeygen::default();
    let request = CreateKeyRequest::new("../escape", Provider::Software);

    let err = create_key(&config(&dir), &request, &keygen).unwrap_err();
    assert!(matches!(err, Error::Policy(_)));
    assert!(!dir.key_dir().exists());
    assert!(!dir.manifest_path().exists());
    assert!(keygen.generated.borrow().is_empty());
}

#[test]
fn test_disallowed_provider_is_refused() {
    let dir = TestKeyDir::new();
    let mut config = config(&dir);
    config.policy = Policy::new([Provider::HardwareBacked], "^.+$").unwrap();

    let err = create_key(
        &config,
        &CreateKeyRequest::new("demo", Provider::Software),
        &FakeKeygen::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("allowed: fido2"), "{err}");
}

#[test]
fn test_existing_files_are_never_overwritten() {
    let dir = TestKeyDir::new();
    dir.write_public("demo", "keep me");
    let keygen = FakeKeygen::default();

    let err = create_key(
        &config(&dir),
        &CreateKeyRequest::new("demo", Provider::Software),
        &keygen,
    )
    .unwrap_err();
    assert!(matches!(err, Error::KeyExists { .. }));
    assert_eq!(err.to_string(), "Key files already exist for demo.");
    assert_eq!(fs::read_to_string(dir.key_path("demo.pub")).unwrap(), "keep me");
    assert!(keygen.generated.borrow().is_empty());
}

#[test]
fn test_resident_software_key_is_invalid() {
    let dir = TestKeyDir::new();
    let mut request = CreateKeyRequest::new("demo", Provider::Software);
    request.resident = true;

    let err = create_key(&config(&dir), &request, &FakeKeygen::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidRequest { .. }));
}

#[test]
fn test_generator_failure_leaves_manifest_alone() {
    let dir = TestKeyDir::new();
    let keygen = FakeKeygen {
        fail: true,
        ..FakeKeygen::default()
    };

    let err = create_key(
        &config(&dir),
        &CreateKeyRequest::new("demo", Provider::HardwareBacked),
        &keygen,
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "fake-keygen failed with exit code 255: device not found");
    assert!(!dir.manifest_path().exists());
}

#[test]
fn test_delete_removes_files_and_entry() {
    let dir = TestKeyDir::new();
    let config = config(&dir);
    let keygen = FakeKeygen::default();
    create_key(&config, &CreateKeyRequest::new("a", Provider::Software), &keygen).unwrap();
    create_key(&config, &CreateKeyRequest::new("b", Provider::Software), &keygen).unwrap();

    let removed = delete_key(&config, "a").unwrap();
    assert_eq!(removed.name, "a");
    dir.assert_file_absent("a");
    dir.assert_file_absent("a.pub");
    dir.assert_file_exists("b");
    assert_eq!(dir.manifest_names(), vec!["b"]);
}

#[test]
fn test_delete_tolerates_already_missing_files() {
    let dir = TestKeyDir::new();
    dir.write_manifest([dir.record_json("ghost", "software")]);

    delete_key(&config(&dir), "ghost").unwrap();
    assert!(dir.manifest_names().is_empty());
}

#[test]
fn test_delete_unknown_key() {
    let dir = TestKeyDir::new();
    let err = delete_key(&config(&dir), "nope").unwrap_err();
    assert!(matches!(err, Error::KeyNotFound { .. }));
}

#[test]
fn test_delete_refuses_escaping_paths() {
    let dir = TestKeyDir::new();
    let victim = dir.root().join("victim");
    fs::write(&victim, "important").unwrap();
    dir.write_ed25519_pair("evil");
    dir.write_manifest([dir.record_json_with_paths(
        "evil",
        "software",
        &dir.key_path("evil.pub").to_string_lossy(),
        "../victim",
    )]);
    let before = fs::read(dir.manifest_path()).unwrap();

    let err = delete_key(&config(&dir), "evil").unwrap_err();
    match err {
        Error::Manifest(inner) => assert!(inner.is_outside_key_dir()),
        other => panic!("expected manifest error, got {other:?}"),
    }
    assert!(victim.exists());
    dir.assert_file_exists("evil.pub");
    assert_eq!(fs::read(dir.manifest_path()).unwrap(), before);
}

#[test]
fn test_lookup_operations() {
    let dir = TestKeyDir::new();
    let config = config(&dir);
    let keygen = FakeKeygen::default();
    for name in ["zulu", "alpha"] {
        create_key(&config, &CreateKeyRequest::new(name, Provider::Software), &keygen).unwrap();
    }

    let names: Vec<String> = list_keys(&config).unwrap().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["alpha", "zulu"]);
    assert!(get_key(&config, "alpha").unwrap().is_some());
    assert!(get_key(&config, "missing").unwrap().is_none());
    assert!(matches!(
        require_key(&config, "missing"),
        Err(Error::KeyNotFound { .. })
    ));
}

#[test]
fn test_read_public_key_is_trimmed() {
    let dir = TestKeyDir::new();
    let config = config(&dir);
    let record = create_key(
        &config,
        &CreateKeyRequest::new("demo", Provider::Software),
        &FakeKeygen::default(),
    )
    .unwrap();

    let line = read_public_key(&config, &record).unwrap();
    assert_eq!(line, format!("ssh-ed25519 {} demo@keyward", keys::ED25519_BLOB));
    assert_eq!(
        public_key_fingerprint(&config, &record).unwrap().as_deref(),
        Some(ED25519_FINGERPRINT)
    );
}

#[test]
fn test_read_public_key_refuses_escaping_path() {
    let dir = TestKeyDir::new();
    dir.write_manifest([dir.record_json_with_paths("evil", "software", "/etc/passwd", "evil")]);
    let config = config(&dir);
    let record = require_key(&config, "evil").unwrap();

    let err = read_public_key(&config, &record).unwrap_err();
    assert!(matches!(err, Error::Manifest(ref e) if e.is_outside_key_dir()));
}

#[test]
fn test_read_public_key_missing_file() {
    let dir = TestKeyDir::new();
    dir.write_manifest([dir.record_json("ghost", "software")]);
    let config = config(&dir);
    let record = require_key(&config, "ghost").unwrap();

    let err = read_public_key(&config, &record).unwrap_err();
    assert!(err.to_string().starts_with("Failed to read public key file"));
}

#[test]
fn test_resident_import_marks_downloaded_keys() {
    let dir = TestKeyDir::new();
    dir.write_sk_pair("older");
    let keygen = FakeKeygen {
        resident_names: vec!["id_ed25519_sk_rk_work"],
        ..FakeKeygen::default()
    };

    let outcome = import_resident_keys(&config(&dir), &keygen).unwrap();
    assert!(outcome.saved);
    assert!(outcome.report.is_clean());

    let config = config(&dir);
    let downloaded = require_key(&config, "id_ed25519_sk_rk_work").unwrap();
    assert!(downloaded.is_resident());
    let older = require_key(&config, "older").unwrap();
    assert_eq!(older.provider(), Provider::HardwareBacked);
    assert!(!older.is_resident());
}

#[test]
fn test_ssh_config_resolves_relative_identity() {
    let dir = TestKeyDir::new();
    dir.write_ed25519_pair("rel");
    dir.write_manifest([dir.record_json_with_paths("rel", "software", "rel.pub", "rel")]);
    let config = config(&dir);
    let record = require_key(&config, "rel").unwrap();

    let snippet = ssh_config_snippet(&config, &record, "github.com").unwrap();
    let identity = keyward_core::canonical_key_dir(&dir.key_dir()).unwrap().join("rel");
    assert_eq!(
        snippet,
        format!(
            "Host github.com\n  IdentityFile {}\n  IdentitiesOnly yes\n",
            identity.display()
        )
    );
}

#[test]
fn test_ssh_config_refuses_escaping_identity() {
    let dir = TestKeyDir::new();
    dir.write_manifest([dir.record_json_with_paths("evil", "software", "evil.pub", "../../x")]);
    let config = config(&dir);
    let record = require_key(&config, "evil").unwrap();

    let err = ssh_config_snippet(&config, &record, "github.com").unwrap_err();
    assert!(matches!(err, Error::Manifest(ref e) if e.is_outside_key_dir()));
}

#[test]
fn test_delete_partial_failure_keeps_entry() {
    let dir = TestKeyDir::new();
    dir.write_private("half");
    fs::create_dir_all(dir.key_path("half.pub")).unwrap();
    dir.write_manifest([dir.record_json("half", "software")]);
    let config = config(&dir);

    let err = delete_key(&config, "half").unwrap_err();

    assert!(err.to_string().starts_with("Failed to remove key files for half"));
    dir.assert_file_absent("half");
    assert_eq!(dir.manifest_names(), vec!["half"]);
}
