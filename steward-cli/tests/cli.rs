use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const DESIRED_FLAGS: [&str; 6] = [
    "--repo-file-path",
    "repository/openeuler.yaml",
    "--sig-file-path",
    "sig/sigs.yaml",
    "--sig-dir",
    "sig",
];

fn steward_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("steward"));
    cmd.env("HOME", home)
        .env_remove("RUST_LOG");
    cmd
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write");
}

fn seed_tree() -> TempDir {
    let tree = TempDir::new().expect("tree");
    write(
        tree.path(),
        "repository/openeuler.yaml",
        "community: openeuler\nrepositories:\n  - name: kernel\n    type: public\n  - name: gcc\n    type: private\n  - name: docs\n    type: public\n",
    );
    write(
        tree.path(),
        "sig/sigs.yaml",
        "sigs:\n  - name: Kernel\n    repositories: [openeuler/kernel]\n  - name: Compiler\n    repositories: [gcc, kernel]\n",
    );
    write(tree.path(), "sig/Kernel/OWNERS", "maintainers: [alice]\ncommitters: [bob]\n");
    tree
}

fn inspect_local(home: &Path, tree: &Path) -> Command {
    let mut cmd = steward_cmd(home);
    cmd.arg("inspect")
        .arg("--local-tree")
        .arg(tree)
        .args(DESIRED_FLAGS);
    cmd
}

#[test]
fn inspect_lists_sigs_of_a_local_tree() {
    let home = TempDir::new().expect("home");
    let tree = seed_tree();

    inspect_local(home.path(), tree.path())
        .assert()
        .success()
        .stdout(contains("openeuler"))
        .stdout(contains("Kernel"))
        .stdout(contains("Compiler"))
        .stdout(contains("not loaded"))
        .stdout(contains("claimed by more than one SIG"));
}

#[test]
fn inspect_json_reports_ownership_and_claims() {
    let home = TempDir::new().expect("home");
    let tree = seed_tree();

    let output = inspect_local(home.path(), tree.path())
        .arg("--json")
        .output()
        .expect("run steward");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(report["org"], "openeuler");
    assert_eq!(report["repositories"], 3);
    assert_eq!(report["unclaimed"], 1);
    assert_eq!(report["sigs"][0]["name"], "Kernel");
    assert_eq!(report["sigs"][0]["owners"], 2);
    assert!(report["sigs"][1]["owners"].is_null());
    assert_eq!(report["multi_sig"]["kernel"], 2);
}

#[test]
fn inspect_without_catalog_fails() {
    let home = TempDir::new().expect("home");
    let tree = TempDir::new().expect("tree");

    inspect_local(home.path(), tree.path())
        .assert()
        .failure()
        .stderr(contains("failed to load repository catalog"));
}

#[test]
fn watching_repo_is_required_without_local_tree() {
    let home = TempDir::new().expect("home");

    steward_cmd(home.path())
        .arg("inspect")
        .args(DESIRED_FLAGS)
        .assert()
        .failure()
        .stderr(contains("--watching-repo"));
}

#[test]
fn malformed_watching_repo_is_rejected() {
    let home = TempDir::new().expect("home");

    steward_cmd(home.path())
        .args(["check", "--watching-repo", "openeuler/community"])
        .args(DESIRED_FLAGS)
        .assert()
        .failure()
        .stderr(contains("invalid watching repo"));
}

#[test]
fn empty_sig_dir_is_rejected() {
    let home = TempDir::new().expect("home");

    steward_cmd(home.path())
        .args([
            "check",
            "--watching-repo",
            "openeuler/community/master",
            "--repo-file-path",
            "repository/openeuler.yaml",
            "--sig-file-path",
            "sig/sigs.yaml",
        ])
        .assert()
        .failure()
        .stderr(contains("--sig-dir must not be empty"));
}

#[test]
fn zero_concurrency_is_rejected() {
    let home = TempDir::new().expect("home");
    let tree = seed_tree();

    steward_cmd(home.path())
        .arg("check")
        .arg("--local-tree")
        .arg(tree.path())
        .args(DESIRED_FLAGS)
        .args(["--concurrent-size", "0"])
        .assert()
        .failure()
        .stderr(contains("--concurrent-size must be bigger than 0"));
}

#[test]
fn missing_token_is_fatal() {
    let home = TempDir::new().expect("home");
    let tree = seed_tree();

    steward_cmd(home.path())
        .arg("check")
        .arg("--local-tree")
        .arg(tree.path())
        .args(DESIRED_FLAGS)
        .arg("--token-path")
        .arg(home.path().join("missing-token"))
        .assert()
        .failure()
        .stderr(contains("failed to load API token"));
}

#[test]
fn blank_token_is_fatal() {
    let home = TempDir::new().expect("home");
    let tree = seed_tree();
    let token = home.path().join("token");
    fs::write(&token, "   \n").expect("write token");

    steward_cmd(home.path())
        .arg("check")
        .arg("--local-tree")
        .arg(tree.path())
        .args(DESIRED_FLAGS)
        .arg("--token-path")
        .arg(&token)
        .assert()
        .failure()
        .stderr(contains("is empty"))
        .stderr(contains(token.display().to_string()));
}
