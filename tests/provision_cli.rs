//! End-to-end tests for the node-provision binary.
//!
//! Each test runs the binary inside a fresh temp directory seeded with a
//! small template tree, then inspects the rendered node tree. Stages that
//! need a live service manager, network, or npm are never enabled here.

#![allow(clippy::expect_used)]

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn provision(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("node-provision").expect("node-provision binary should exist");
    cmd.current_dir(dir.path());
    cmd
}

fn seed_templates(base: &Path) {
    let templates = base.join("templates");
    std::fs::create_dir_all(&templates).expect("create templates");
    std::fs::write(
        templates.join("yagna.service.template"),
        "[Unit]\nDescription=%%YAGNA_SERVICE_NAME%%\n\n[Service]\nWorkingDirectory=%%YAGNA_ROOT_DIR%%\n",
    )
    .expect("write yagna template");
    std::fs::write(
        templates.join("vanity.service.template"),
        "[Unit]\nDescription=%%VANITY_SERVICE_NAME%%\n\n[Service]\nWorkingDirectory=%%CLI_ROOT_DIR%%\n",
    )
    .expect("write vanity template");
    std::fs::write(
        templates.join("run.sh.template"),
        "#!/bin/sh\nexec ./yagna service run # %%NODE_NAME%%\n",
    )
    .expect("write run template");
}

#[test]
fn test_missing_node_name_fails_parse() {
    let dir = TempDir::new().expect("tempdir");
    provision(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--node-name"));
}

#[test]
fn test_help_lists_all_flags() {
    let dir = TempDir::new().expect("tempdir");
    provision(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--node-name"))
        .stdout(predicate::str::contains("--overwrite"))
        .stdout(predicate::str::contains("--install-services"))
        .stdout(predicate::str::contains("--clone-repo"))
        .stdout(predicate::str::contains("--prepare-yagna"))
        .stdout(predicate::str::contains("--udp-port"))
        .stdout(predicate::str::contains("--api-port"))
        .stdout(predicate::str::contains("--status-port"));
}

#[test]
fn test_default_run_renders_node_tree() {
    let dir = TempDir::new().expect("tempdir");
    seed_templates(dir.path());

    provision(&dir)
        .args(["--node-name", "alpha"])
        .assert()
        .success();

    let node_root = dir.path().join("services/alpha");
    let yagna_unit = node_root.join("services/yagna-alpha.service");
    let vanity_unit = node_root.join("services/vanity-alpha.service");
    let run_sh = node_root.join("run.sh");
    assert!(yagna_unit.exists(), "missing {}", yagna_unit.display());
    assert!(vanity_unit.exists(), "missing {}", vanity_unit.display());
    assert!(run_sh.exists(), "missing {}", run_sh.display());

    for path in [&yagna_unit, &vanity_unit, &run_sh] {
        let content = std::fs::read_to_string(path).expect("read rendered file");
        assert!(!content.contains("%%"), "unsubstituted token in {}", path.display());
    }
    let unit = std::fs::read_to_string(&yagna_unit).expect("read unit");
    assert!(unit.contains("Description=yagna-alpha"));
}

#[test]
fn test_rerun_without_overwrite_exits_one() {
    let dir = TempDir::new().expect("tempdir");
    seed_templates(dir.path());

    provision(&dir).args(["--node-name", "alpha"]).assert().success();
    provision(&dir)
        .args(["--node-name", "alpha"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"))
        .stderr(predicate::str::contains("--overwrite"));
}

#[test]
fn test_rerun_with_overwrite_replaces_tree() {
    let dir = TempDir::new().expect("tempdir");
    seed_templates(dir.path());

    provision(&dir).args(["--node-name", "alpha"]).assert().success();
    let stale = dir.path().join("services/alpha/stale.txt");
    std::fs::write(&stale, b"old").expect("write stale");

    provision(&dir)
        .args(["--node-name", "alpha", "--overwrite"])
        .assert()
        .success();

    assert!(!stale.exists(), "stale file should be gone after overwrite");
    assert!(dir.path().join("services/alpha/services/yagna-alpha.service").exists());
}

#[test]
fn test_invalid_node_name_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    seed_templates(dir.path());

    provision(&dir)
        .args(["--node-name", "Bad/Name"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
    assert!(!dir.path().join("services").exists(), "nothing should be created");
}

#[test]
fn test_two_nodes_coexist_under_one_base() {
    let dir = TempDir::new().expect("tempdir");
    seed_templates(dir.path());

    provision(&dir).args(["--node-name", "alpha"]).assert().success();
    provision(&dir).args(["--node-name", "beta"]).assert().success();

    assert!(dir.path().join("services/alpha/services/yagna-alpha.service").exists());
    assert!(dir.path().join("services/beta/services/yagna-beta.service").exists());
}

#[test]
fn test_json_output_is_parseable_summary() {
    let dir = TempDir::new().expect("tempdir");
    seed_templates(dir.path());

    let output = provision(&dir)
        .args(["--node-name", "alpha", "--json"])
        .output()
        .expect("command should run");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(summary["node_name"], "alpha");
    assert_eq!(summary["services_installed"], false);
    assert_eq!(summary["client_env_skipped"], false);
    assert_eq!(
        summary["rendered"].as_array().expect("rendered array").len(),
        3
    );
    // The generated secret must never appear in machine output.
    assert!(summary.get("app_key").is_none());
}

#[test]
fn test_quiet_run_prints_nothing_on_stdout() {
    let dir = TempDir::new().expect("tempdir");
    seed_templates(dir.path());

    provision(&dir)
        .args(["--node-name", "alpha", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_missing_template_dir_exits_one() {
    let dir = TempDir::new().expect("tempdir");

    provision(&dir)
        .args(["--node-name", "alpha"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}
