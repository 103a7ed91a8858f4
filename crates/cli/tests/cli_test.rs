use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn storm(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("storm").unwrap();
    cmd.arg("--cwd")
        .arg(cwd)
        .env_remove("RUST_LOG")
        .env_remove("STORM_ENV")
        .env_remove("NODE_ENV")
        .env_remove("STORM_WORKSPACE_ROOT")
        .env_remove("NX_WORKSPACE_ROOT_PATH");
    cmd
}

#[test]
fn test_error_lookup_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let table = temp_dir.path().join("codes.json");
    fs::write(&table, "{}").unwrap();

    for (message, expected) in [("Missing value", "1"), ("Bad input", "2"), ("Missing value", "1")] {
        storm(temp_dir.path())
            .args(["error-lookup", "--type", "general", "--message", message, "--file-path"])
            .arg(&table)
            .assert()
            .success()
            .stdout(format!("{expected}\n"));
    }

    let persisted: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&table).unwrap()).unwrap();
    assert_eq!(persisted["general"]["2"], "Bad input");
}

#[test]
fn test_error_lookup_missing_table_fails() {
    let temp_dir = TempDir::new().unwrap();
    storm(temp_dir.path())
        .args(["error-lookup", "--type", "general", "--message", "x", "--file-path"])
        .arg(temp_dir.path().join("missing.json"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("❌"));
}

#[test]
fn test_commit_vars_from_stdin_merges() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("vars.json");

    storm(temp_dir.path())
        .args(["commit-vars", "--file-path"])
        .arg(&target)
        .write_stdin(r#"{"name":"StormVariables","properties":{"a":{"name":"a","typeName":"string"},"b":{"name":"b","typeName":"string"}}}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("Committed StormVariables"));

    storm(temp_dir.path())
        .args(["commit-vars", "--file-path"])
        .arg(&target)
        .write_stdin(r#"{"name":"StormVariables","properties":{"b":{"name":"b","typeName":"number"},"c":{"name":"c","typeName":"string"}}}"#)
        .assert()
        .success();

    let persisted: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    let properties = persisted["properties"].as_object().unwrap();
    assert_eq!(properties.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert_eq!(properties["b"]["typeName"], "number");
}

#[test]
fn test_commit_config_rejects_malformed_target() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("config.json");
    fs::write(&target, "{ not json").unwrap();

    storm(temp_dir.path())
        .args(["commit-config", "--file-path"])
        .arg(&target)
        .write_stdin(r#"{"name":"StormConfig"}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed"));
    assert_eq!(fs::read_to_string(&target).unwrap(), "{ not json");
}

#[test]
fn test_new_add_and_build_application() {
    let temp_dir = TempDir::new().unwrap();
    storm(temp_dir.path())
        .args(["new", "application", "api"])
        .assert()
        .success();
    let project = temp_dir.path().join("api");

    storm(temp_dir.path())
        .args(["new", "application", "api"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    storm(&project)
        .args(["add", "plugin", "log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already configured"));

    storm(&project)
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("build completed"));

    for file in ["log.ts", "error.ts", "env.ts"] {
        assert!(project.join(".storm/runtime").join(file).exists(), "{file}");
    }
    assert!(project.join(".storm/types/vars.d.ts").exists());
    assert!(project.join(".storm/reflections/vars.json").exists());
    assert!(project.join(".storm/reflections/config-values.bin").exists());

    storm(&project)
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 2 directories"));
    assert!(!project.join(".storm/runtime").exists());
    assert!(project.join(".storm/reflections/vars.json").exists());
}

#[test]
fn test_gc_reports_count() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join(".storm/cache")).unwrap();
    let leftover = temp_dir.path().join(".storm/leftover.tmp");
    fs::write(&leftover, "").unwrap();
    fs::File::options()
        .write(true)
        .open(&leftover)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(3600))
        .unwrap();

    storm(temp_dir.path())
        .arg("gc")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 2 entries"));
}

#[test]
fn test_invalid_mode_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    storm(temp_dir.path())
        .args(["build", "--mode", "staging"])
        .assert()
        .failure();
}
