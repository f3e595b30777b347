//! The `prco` binary, driven with PR payload files so no hosting API is needed.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use insta_cmd::get_cargo_bin;
use pr_checkout::git::RawPullRequest;

use crate::common::{TestRepo, commit, isolate, payload};

fn prco(repo: &TestRepo, args: &[&str]) -> Output {
    let mut cmd = Command::new(get_cargo_bin("prco"));
    isolate(&mut cmd)
        .arg("-C")
        .arg(repo.root_path())
        .args(args)
        .env("PRCO_CONFIG_PATH", repo.root_path().join("no-such-config.toml"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("PRCO_PROVIDER")
        .env_remove("PRCO_FETCH_DEPTH")
        .env_remove("PRCO_MARK_REMOTES");
    cmd.output().expect("Failed to run prco")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

fn write_payload(repo: &TestRepo, raw: &RawPullRequest) -> PathBuf {
    let path = repo.root_path().join(format!("../pr-{}.json", raw.number));
    std::fs::write(&path, serde_json::to_string_pretty(raw).unwrap()).unwrap();
    path
}

/// A PR from a branch of the upstream repository itself.
fn same_repo_payload(repo: &TestRepo) -> PathBuf {
    let origin = repo.origin_path();
    crate::common::git(origin, &["checkout", "-b", "fix-typo"]);
    commit(origin, "README.md", "fixed\n", "Fix typo");
    crate::common::git(origin, &["checkout", "main"]);
    let raw = payload(
        7,
        "me",
        ("aaa", "bbb", "fix-typo", origin),
        ("aaa", "bbb", "main", origin),
    );
    write_payload(repo, &raw)
}

fn checkout(repo: &TestRepo, payload: &Path) -> Output {
    prco(repo, &["checkout", "7", "--payload", payload.to_str().unwrap()])
}

#[test]
fn test_checkout_same_repo_pr() {
    let repo = TestRepo::new();
    let payload = same_repo_payload(&repo);

    let output = checkout(&repo, &payload);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "✅ Checked out PR #7 as pr/me/7 (tracking origin/fix-typo)"
    );
    assert_eq!(repo.current_branch(), "pr/me/7");
    assert_eq!(repo.remotes().len(), 1);
    assert_eq!(
        repo.config("branch.pr/me/7.github-pr-owner-number").as_deref(),
        Some("aaa#bbb#7")
    );

    // Running it again changes nothing
    let config = repo.git(&["config", "--list", "--local"]);
    let output = checkout(&repo, &payload);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(repo.git(&["config", "--list", "--local"]), config);
}

#[test]
fn test_show_and_list() {
    let repo = TestRepo::new();
    let payload = same_repo_payload(&repo);
    assert!(checkout(&repo, &payload).status.success());

    let output = prco(&repo, &["show"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "pr/me/7 → aaa/bbb#7");

    let output = prco(&repo, &["show", "main"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "⚪ main was not checked out from a PR");

    let output = prco(&repo, &["list"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "pr/me/7  aaa/bbb#7");
}

#[test]
fn test_list_without_pr_branches() {
    let repo = TestRepo::new();

    let output = prco(&repo, &["list"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), "⚪ No PR branches");
}

#[test]
fn test_deleted_fork_exits_with_code_2() {
    let repo = TestRepo::new();
    let mut raw = payload(
        7,
        "me",
        ("you", "bbb", "main", repo.origin_path()),
        ("aaa", "bbb", "main", repo.origin_path()),
    );
    raw.head.repo = None;
    let payload = write_payload(&repo, &raw);

    let output = checkout(&repo, &payload);

    assert_eq!(output.status.code(), Some(2));
    let stderr = stderr(&output);
    assert!(
        stderr.contains("Cannot checkout PR #7: branch main no longer exists in you/bbb"),
        "{stderr}"
    );
    assert!(stderr.contains("💡"), "{stderr}");
    assert_eq!(repo.remotes().len(), 1);
    assert_eq!(repo.current_branch(), "main");
}

#[test]
fn test_payload_number_mismatch() {
    let repo = TestRepo::new();
    let raw = payload(
        8,
        "me",
        ("aaa", "bbb", "main", repo.origin_path()),
        ("aaa", "bbb", "main", repo.origin_path()),
    );
    let payload = write_payload(&repo, &raw);

    let output = checkout(&repo, &payload);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("describes PR #8, not #7"));
}

#[test]
fn test_invalid_config_is_reported() {
    let repo = TestRepo::new();
    let config = repo.root_path().join("../config.toml");
    std::fs::write(&config, "fetch-depth = 0\n").unwrap();

    let output = prco(&repo, &["--config", config.to_str().unwrap(), "list"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to load config"));
}
