use pr_checkout::git::{
    CheckoutSettings, NamingScheme, PrProvenance, PullRequestRecord, checkout_pull_request,
    is_remote_created_for_pr, pr_branches, pr_for_branch,
};

use crate::common::{TestRepo, payload, resolve_from_disk};

fn checked_out(repo: &TestRepo, number: u64, author: &str, owner: &str) {
    let fork = repo.fork(owner, "bbb", "my-branch");
    let raw = payload(
        number,
        author,
        (owner, "bbb", "my-branch", &fork),
        ("aaa", "bbb", "main", repo.origin_path()),
    );
    let mut pr = PullRequestRecord::from_raw_payload(&raw, &resolve_from_disk(&fork)).unwrap();
    checkout_pull_request(
        &repo.repository(),
        &mut pr,
        &NamingScheme::default(),
        CheckoutSettings::default(),
    )
    .unwrap();
}

#[test]
fn test_pr_for_branch() {
    let repo = TestRepo::new();
    checked_out(&repo, 100, "me", "you");
    let git = repo.repository();

    assert_eq!(
        pr_for_branch(&git, "pr/me/100", "github").unwrap(),
        Some(PrProvenance {
            owner: "you".into(),
            repo: "bbb".into(),
            pr_id: 100,
        })
    );
    assert_eq!(pr_for_branch(&git, "main", "github").unwrap(), None);
    assert_eq!(pr_for_branch(&git, "pr/me/100", "azure").unwrap(), None);
}

#[test]
fn test_pr_for_branch_rejects_corrupt_value() {
    let repo = TestRepo::new();
    repo.git(&["config", "branch.main.github-pr-owner-number", "you#bbb#abc"]);

    assert!(pr_for_branch(&repo.repository(), "main", "github").is_err());
}

#[test]
fn test_pr_branches() {
    let repo = TestRepo::new();
    checked_out(&repo, 100, "me", "you");
    checked_out(&repo, 7, "them", "they");
    repo.git(&["config", "branch.scratch.github-pr-owner-number", "junk"]);
    repo.git(&["config", "branch.other.azure-pr-owner-number", "x#y#1"]);

    let branches = pr_branches(&repo.repository(), "github").unwrap();
    let summary: Vec<_> = branches
        .iter()
        .map(|b| (b.branch.as_str(), b.provenance.as_ref().map(|p| p.pr_id).ok()))
        .collect();

    assert_eq!(
        summary,
        vec![
            ("pr/me/100", Some(100)),
            ("pr/them/7", Some(7)),
            ("scratch", None),
        ]
    );
}

#[test]
fn test_remote_marker() {
    let repo = TestRepo::new();
    checked_out(&repo, 100, "me", "you");
    let git = repo.repository();

    assert!(is_remote_created_for_pr(&git, "you", "github").unwrap());
    assert!(!is_remote_created_for_pr(&git, "origin", "github").unwrap());
    assert!(!is_remote_created_for_pr(&git, "missing", "github").unwrap());
}
