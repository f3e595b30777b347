//! `GitRepository` against real git.

use pr_checkout::git::{CheckoutOptions, FailureKind, RepoError, RepositoryOps, Upstream};

use crate::common::{TestRepo, commit};

#[test]
fn test_checkout_creates_missing_branch_with_upstream() {
    let repo = TestRepo::new();
    let git = repo.repository();
    let options = CheckoutOptions {
        create_if_missing: true,
        track: Some(Upstream {
            remote: "origin".into(),
            branch: "main".into(),
        }),
        reset_to: None,
    };

    git.checkout("topic", &options).unwrap();

    assert_eq!(repo.current_branch(), "topic");
    assert_eq!(repo.git(&["rev-parse", "topic"]), repo.git(&["rev-parse", "main"]));
    assert_eq!(repo.config("branch.topic.remote").as_deref(), Some("origin"));
    assert_eq!(
        repo.config("branch.topic.merge").as_deref(),
        Some("refs/heads/main")
    );
}

#[test]
fn test_checkout_creates_branch_at_given_commit() {
    let repo = TestRepo::new();
    let base = repo.head_sha();
    commit(repo.root_path(), "later.txt", "later\n", "Later");
    let options = CheckoutOptions {
        create_if_missing: true,
        track: None,
        reset_to: Some(base.clone()),
    };

    repo.repository().checkout("old", &options).unwrap();

    assert_eq!(repo.current_branch(), "old");
    assert_eq!(repo.head_sha(), base);
    assert_eq!(repo.config("branch.old.remote"), None);
}

#[test]
fn test_checkout_missing_branch_without_create_fails() {
    let repo = TestRepo::new();

    let err = repo
        .repository()
        .checkout("nope", &CheckoutOptions::default())
        .unwrap_err();

    assert!(matches!(err, RepoError::Failed { .. }));
    assert_eq!(err.kind(), FailureKind::NotFound);
    assert_eq!(repo.current_branch(), "main");
}

#[test]
fn test_reset_keeps_uncommitted_changes() {
    let repo = TestRepo::new();
    let git = repo.repository();
    let base = repo.head_sha();
    let target = commit(repo.root_path(), "other.txt", "other\n", "Other");
    repo.git(&["reset", "--hard", &base]);
    std::fs::write(repo.root_path().join("README.md"), "my local edit\n").unwrap();
    assert!(git.has_uncommitted_changes().unwrap());

    let options = CheckoutOptions {
        reset_to: Some(target.clone()),
        ..CheckoutOptions::default()
    };
    git.checkout("main", &options).unwrap();

    assert_eq!(repo.head_sha(), target);
    assert!(repo.root_path().join("other.txt").exists());
    assert_eq!(
        std::fs::read_to_string(repo.root_path().join("README.md")).unwrap(),
        "my local edit\n"
    );
}

#[test]
fn test_reset_refuses_to_overwrite_uncommitted_changes() {
    let repo = TestRepo::new();
    let base = repo.head_sha();
    let target = commit(repo.root_path(), "README.md", "theirs\n", "Rewrite readme");
    repo.git(&["reset", "--hard", &base]);
    std::fs::write(repo.root_path().join("README.md"), "my local edit\n").unwrap();

    let options = CheckoutOptions {
        reset_to: Some(target),
        ..CheckoutOptions::default()
    };
    assert!(repo.repository().checkout("main", &options).is_err());

    assert_eq!(repo.head_sha(), base);
    assert_eq!(
        std::fs::read_to_string(repo.root_path().join("README.md")).unwrap(),
        "my local edit\n"
    );
}

#[test]
fn test_has_uncommitted_changes_ignores_untracked_files() {
    let repo = TestRepo::new();
    let git = repo.repository();
    assert!(!git.has_uncommitted_changes().unwrap());

    std::fs::write(repo.root_path().join("scratch.txt"), "notes\n").unwrap();
    assert!(!git.has_uncommitted_changes().unwrap());

    std::fs::write(repo.root_path().join("README.md"), "edited\n").unwrap();
    repo.git(&["add", "README.md"]);
    assert!(git.has_uncommitted_changes().unwrap());
}
