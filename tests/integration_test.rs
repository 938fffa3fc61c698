use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_help_command() {
    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("portable tree"));
}

#[test]
fn test_version_command() {
    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dotkeep"));
}

#[test]
fn test_init_command() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let storage_root = temp_dir.path().join("storage");

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("init")
        .arg("--storage-root")
        .arg(&storage_root)
        .assert()
        .success();

    assert!(config_path.exists());
    assert!(storage_root.join("os").is_dir());
    assert!(storage_root.join("ide").is_dir());
    assert!(storage_root.join("terminal").is_dir());

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("storage_root"));
    assert!(content.contains("backup"));
}

#[test]
fn test_init_fails_when_config_exists() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    fs::write(&config_path, "storage_root = \"/tmp/storage\"").unwrap();

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_init_force_overwrites() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    fs::write(&config_path, "# stale").unwrap();

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("init")
        .arg("--force")
        .arg("--storage-root")
        .arg(temp_dir.path().join("storage"))
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(!content.contains("# stale"));
    assert!(content.contains("storage_root"));
}

#[test]
fn test_status_without_init() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("init"));
}

#[test]
fn test_domains_lists_catalog() {
    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("domains")
        .assert()
        .success()
        .stdout(predicate::str::contains("bash"))
        .stdout(predicate::str::contains("ubuntu"))
        .stdout(predicate::str::contains("vscode"));
}

#[test]
fn test_domains_filters_by_kind() {
    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("domains")
        .arg("--kind")
        .arg("terminal")
        .assert()
        .success()
        .stdout(predicate::str::contains("bash"))
        .stdout(predicate::str::contains("zsh").and(predicate::str::contains("vscode").not()));
}

#[test]
fn test_domains_rejects_unknown_kind() {
    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("domains")
        .arg("--kind")
        .arg("browser")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown kind"));
}

#[test]
fn test_import_unknown_domain_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("init")
        .arg("--storage-root")
        .arg(temp_dir.path().join("storage"))
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("import")
        .arg("no-such-domain")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown domain"));
}

#[test]
fn test_pkg_list_creates_default_list() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let storage_root = temp_dir.path().join("storage");

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("init")
        .arg("--storage-root")
        .arg(&storage_root)
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("pkg")
        .arg("list")
        .arg("arch")
        .assert()
        .success()
        .stdout(predicate::str::contains("git"));

    // the declarative list was created with its default content
    let list = storage_root.join("os").join("arch").join("pacman.txt");
    let content = fs::read_to_string(list).unwrap();
    assert!(content.starts_with('#'));
}

#[test]
fn test_pkg_requires_manager_when_ambiguous() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("init")
        .arg("--storage-root")
        .arg(temp_dir.path().join("storage"))
        .assert()
        .success();

    // ubuntu has apt and snap
    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("pkg")
        .arg("list")
        .arg("ubuntu")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--manager"));
}

#[test]
fn test_config_show_and_set_family() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("init")
        .arg("--storage-root")
        .arg(temp_dir.path().join("storage"))
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("config")
        .arg("--set-family")
        .arg("macos")
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("config")
        .arg("--show")
        .assert()
        .success()
        .stdout(predicate::str::contains("family_override = \"macos\""));

    // the pinned family now drives classification
    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("macos"));
}

#[test]
fn test_config_rejects_unknown_family() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("init")
        .arg("--storage-root")
        .arg(temp_dir.path().join("storage"))
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("config")
        .arg("--set-family")
        .arg("plan9")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown family"));
}

#[test]
#[serial_test::serial]
fn test_doctor_command() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("init")
        .arg("--storage-root")
        .arg(temp_dir.path().join("storage"))
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("dotkeep").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config file exists"));
}
