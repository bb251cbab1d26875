//! End-to-end tests for the keyward binary.
//!
//! Every test points `--config` at a scratch directory and sets `HOME` so
//! the real user's keys are never touched.

use assert_cmd::Command;
use assert_fs::prelude::*;
use keyward_test_utils::TestKeyDir;
use keyward_test_utils::keys::{ED25519_FINGERPRINT, ed25519_line};
use predicates::prelude::*;
use serde_json::{Value, json};

fn keyward_cmd(env: &TestKeyDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("keyward"));
    cmd.env("HOME", env.home())
        .env("XDG_CONFIG_HOME", env.config_dir())
        .env_remove("KEYWARD_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(env.config_path());
    cmd
}

fn configured() -> TestKeyDir {
    let env = TestKeyDir::new();
    env.write_config(json!({}));
    env
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ============================================================================
// Help, version and completions
// ============================================================================

#[test]
fn test_help_output() {
    let env = TestKeyDir::new();
    keyward_cmd(&env)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("repair"));
}

#[test]
fn test_no_command_shows_help_hint() {
    let env = TestKeyDir::new();
    keyward_cmd(&env)
        .assert()
        .success()
        .stdout(predicate::str::contains("keyward --help"));
}

#[test]
fn test_version_json() {
    let env = TestKeyDir::new();
    let output = keyward_cmd(&env)
        .args(["version", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value["name"], "keyward");
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_completions_bash() {
    let env = TestKeyDir::new();
    keyward_cmd(&env)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("keyward"));
}

// ============================================================================
// Init and info
// ============================================================================

#[cfg(unix)]
#[test]
fn test_init_writes_config_and_key_dir() {
    let env = TestKeyDir::new();
    keyward_cmd(&env)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote config"));

    assert!(env.config_path().is_file());
    assert!(env.home().join(".ssh").join("keyward").is_dir());
}

#[test]
fn test_init_keeps_existing_config() {
    let env = configured();
    let before = std::fs::read_to_string(env.config_path()).unwrap();

    let output = keyward_cmd(&env)
        .args(["init", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["wrote_config"], false);

    let after = std::fs::read_to_string(env.config_path()).unwrap();
    assert_eq!(before, after);
    assert!(env.key_dir().is_dir());
}

#[test]
fn test_info_json_reports_configured_paths() {
    let env = configured();
    let output = keyward_cmd(&env).args(["info", "--json"]).output().unwrap();
    assert!(output.status.success());

    let value = stdout_json(&output);
    assert_eq!(value["key_dir"], env.key_dir().to_string_lossy().as_ref());
    assert_eq!(value["allowed_providers"], json!(["fido2", "software"]));
}

#[test]
fn test_invalid_config_is_a_user_error() {
    let env = TestKeyDir::new();
    env.write_config(json!({ "key_dir": 5 }));

    keyward_cmd(&env)
        .arg("scan")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("key_dir must be a string"));
}

// ============================================================================
// Scan
// ============================================================================

#[test]
fn test_scan_clean_exits_zero() {
    let env = configured();
    env.write_ed25519_pair("work");
    env.write_manifest([env.record_json("work", "software")]);

    keyward_cmd(&env)
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("Manifest matches key directory"));
}

#[test]
fn test_scan_drift_exits_one_with_json_report() {
    let env = configured();
    env.write_ed25519_pair("work");
    env.write_public("stray", &ed25519_line("stray"));
    env.write_private("lonely");
    env.write_manifest([env.record_json("gone", "fido2")]);

    let output = keyward_cmd(&env).args(["scan", "--json"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report = stdout_json(&output);
    assert_eq!(report["key_dir_untracked_pairs"], json!(["work"]));
    assert_eq!(report["key_dir_orphan_public_keys"], json!(["stray.pub"]));
    assert_eq!(report["key_dir_orphan_private_keys"], json!(["lonely"]));
    assert_eq!(
        report["manifest_entries_missing_files"],
        json!([{ "name": "gone", "missing": ["private", "public"] }])
    );
    assert_eq!(report["invalid_manifest_paths"], json!([]));
}

#[test]
fn test_scan_reports_escaping_paths() {
    let env = configured();
    env.write_manifest([env.record_json_with_paths(
        "evil",
        "software",
        "../../outside.pub",
        "../../outside",
    )]);

    let output = keyward_cmd(&env).args(["scan", "--json"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let report = stdout_json(&output);
    assert_eq!(report["invalid_manifest_paths"][0]["name"], "evil");
    assert_eq!(report["manifest_entries_missing_files"], json!([]));
}

#[test]
fn test_scan_corrupt_manifest_fails() {
    let env = configured();
    env.write_manifest_raw("{not json");

    keyward_cmd(&env)
        .arg("scan")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid JSON"));
}

// ============================================================================
// Repair
// ============================================================================

#[test]
fn test_repair_without_flags_is_a_user_error() {
    let env = configured();
    keyward_cmd(&env)
        .arg("repair")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Nothing to do"));
}

#[test]
fn test_repair_import_tracks_untracked_pair() {
    let env = configured();
    env.write_ed25519_pair("work");

    keyward_cmd(&env)
        .args(["repair", "--import"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported work"))
        .stdout(predicate::str::contains("modification time"));

    assert_eq!(env.manifest_names(), vec!["work".to_string()]);
    let manifest = env.read_manifest_json();
    assert_eq!(manifest["keys"]["work"]["provider"], "software");

    keyward_cmd(&env).arg("scan").assert().success();
}

#[test]
fn test_repair_prune_missing_with_yes() {
    let env = configured();
    env.write_ed25519_pair("kept");
    env.write_manifest([
        env.record_json("kept", "software"),
        env.record_json("gone", "fido2"),
    ]);

    let output = keyward_cmd(&env)
        .args(["repair", "--prune-missing", "--yes", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let outcome = stdout_json(&output);
    assert_eq!(outcome["applied"]["pruned_missing"], json!(["gone"]));
    assert_eq!(outcome["saved"], true);
    assert_eq!(env.manifest_names(), vec!["kept".to_string()]);
}

#[test]
fn test_repair_prune_without_confirmation_changes_nothing() {
    let env = configured();
    env.write_manifest([env.record_json("gone", "fido2")]);

    keyward_cmd(&env)
        .args(["repair", "--prune-missing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not pruned without confirmation"));

    assert_eq!(env.manifest_names(), vec!["gone".to_string()]);
}

// ============================================================================
// Key commands
// ============================================================================

#[test]
fn test_list_json_includes_fingerprint() {
    let env = configured();
    env.write_ed25519_pair("work");
    env.write_manifest([env.record_json("work", "software")]);

    let output = keyward_cmd(&env).args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());

    let list = stdout_json(&output);
    assert_eq!(list.as_array().map(Vec::len), Some(1));
    assert_eq!(list[0]["name"], "work");
    assert_eq!(list[0]["fingerprint"], ED25519_FINGERPRINT);
}

#[test]
fn test_list_empty_manifest() {
    let env = configured();
    keyward_cmd(&env)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No keys tracked"));
}

#[test]
fn test_pubkey_prints_line_and_fingerprint() {
    let env = configured();
    env.write_ed25519_pair("work");
    env.write_manifest([env.record_json("work", "software")]);

    keyward_cmd(&env)
        .args(["pubkey", "work"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ssh-ed25519 "));

    keyward_cmd(&env)
        .args(["pubkey", "work", "--fingerprint"])
        .assert()
        .success()
        .stdout(predicate::str::contains(ED25519_FINGERPRINT));
}

#[test]
fn test_pubkey_outside_key_dir_is_rejected() {
    let env = configured();
    env.write_manifest([env.record_json_with_paths(
        "evil",
        "software",
        "../../outside.pub",
        "../../outside",
    )]);

    keyward_cmd(&env)
        .args(["pubkey", "evil"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("outside key dir"));
}

#[test]
fn test_ssh_config_block() {
    let env = configured();
    env.write_ed25519_pair("work");
    env.write_manifest([env.record_json("work", "software")]);

    keyward_cmd(&env)
        .args(["ssh-config", "work", "--host", "github.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Host github.com"))
        .stdout(predicate::str::contains("IdentitiesOnly yes"));
}

#[test]
fn test_ssh_config_refuses_escaping_identity() {
    let env = configured();
    env.write_manifest([env.record_json_with_paths("evil", "software", "evil.pub", "/etc/passwd")]);

    keyward_cmd(&env)
        .args(["ssh-config", "evil", "--host", "github.com"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("outside key dir"));
}

#[test]
fn test_delete_with_yes_removes_files_and_entry() {
    let env = configured();
    env.write_ed25519_pair("work");
    env.write_manifest([env.record_json("work", "software")]);

    keyward_cmd(&env)
        .args(["delete", "work", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted work"));

    assert!(env.manifest_names().is_empty());
    env.assert_file_absent("work");
    env.assert_file_absent("work.pub");
}

#[test]
fn test_delete_without_confirmation_is_canceled() {
    let env = configured();
    env.write_ed25519_pair("work");
    env.write_manifest([env.record_json("work", "software")]);

    keyward_cmd(&env)
        .args(["delete", "work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Canceled"));

    assert_eq!(env.manifest_names(), vec!["work".to_string()]);
    env.assert_file_exists("work");
}

#[test]
fn test_delete_unknown_key_exits_two() {
    let env = configured();
    keyward_cmd(&env)
        .args(["delete", "nope", "--yes"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Key not found: nope"));
}

#[test]
fn test_create_rejects_invalid_name() {
    let env = configured();
    keyward_cmd(&env)
        .args(["create", "--name", "_bad", "--provider", "software", "--no-passphrase"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not match pattern"));

    keyward_cmd(&env)
        .args(["create", "--name", "a/b", "--provider", "software", "--no-passphrase"])
        .assert()
        .code(2);
}

#[test]
fn test_create_rejects_disallowed_provider() {
    let env = TestKeyDir::new();
    env.write_config(json!({ "allowed_providers": ["software"] }));

    keyward_cmd(&env)
        .args(["create", "--name", "work"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not allowed"));
}

#[test]
fn test_create_refuses_existing_files() {
    let env = configured();
    env.write_ed25519_pair("work");

    keyward_cmd(&env)
        .args(["create", "--name", "work", "--provider", "software", "--no-passphrase"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already exist"));
}

#[test]
fn test_export_csv() {
    let env = configured();
    env.write_ed25519_pair("work");
    env.write_manifest([env.record_json("work", "software")]);
    let out = assert_fs::TempDir::new().unwrap();
    let file = out.child("keys.csv");

    keyward_cmd(&env)
        .args(["export", "--format", "csv", "--output"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 keys as csv"));

    file.assert(predicate::path::is_file());
    let csv = std::fs::read_to_string(file.path()).unwrap();
    assert!(csv.starts_with("name,provider,created_at,"));
    assert!(csv.contains("\r\nwork,software,"));
}

#[test]
fn test_export_json_defaults() {
    let env = configured();
    env.write_manifest([env.record_json("work", "fido2")]);
    let out = assert_fs::TempDir::new().unwrap();
    let file = out.child("keys.json");

    keyward_cmd(&env)
        .args(["export", "-o"])
        .arg(file.path())
        .assert()
        .success();

    file.assert(predicate::path::is_file());
    let exported: Value =
        serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
    assert_eq!(exported[0]["name"], "work");
    assert_eq!(exported[0]["provider"], "fido2");
}
