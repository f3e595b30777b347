//! User-facing messages for the CLI.

use color_print::cformat;

use crate::git::{
    CheckoutReport, FailureKind, PrBranch, PrProvenance, PullRequestRecord, RepoError,
    is_unresolved_head,
};
use crate::styling::{
    BRANCH, ERROR_EMOJI, HINT_EMOJI, INFO_EMOJI, INVALID, SUCCESS_EMOJI, WARNING_EMOJI,
};

/// Summary lines for a finished checkout.
pub fn checkout_summary(pr: &PullRequestRecord, report: &CheckoutReport) -> String {
    let mut lines = Vec::new();
    if report.remote_created {
        let remote = &report.remote;
        let fork = format!("{}/{}", pr.head.owner, pr.head.repo);
        lines.push(cformat!(
            "{INFO_EMOJI} Added remote <bold>{remote}</> for <bold>{fork}</>"
        ));
    }
    for warning in &report.warnings {
        lines.push(cformat!("{WARNING_EMOJI} <yellow>{warning}</>"));
    }

    let id = pr.id;
    let branch = &report.branch;
    let upstream = &report.upstream;
    lines.push(cformat!(
        "{SUCCESS_EMOJI} <green>Checked out PR #{id} as <bold>{branch}</> (tracking <bold>{upstream}</>)</>"
    ));
    lines.join("\n")
}

/// Error report for the CLI: the error, then any causes it doesn't already spell out.
pub fn error_message(err: &anyhow::Error) -> String {
    let mut lines = vec![cformat!("{ERROR_EMOJI} <red>{err}</>")];
    let mut shown = err.to_string();
    for cause in err.chain().skip(1) {
        let cause = cause.to_string();
        if shown.contains(&cause) {
            continue;
        }
        lines.push(cformat!("   <dim>{cause}</>"));
        shown = cause;
    }
    if is_unresolved_head(err) {
        lines.push(cformat!(
            "{HINT_EMOJI} <dim>The fork or branch was deleted; ask the author to push it again</>"
        ));
    } else if let Some(hint) = git_failure_hint(err) {
        lines.push(cformat!("{HINT_EMOJI} <dim>{hint}</>"));
    }
    lines.join("\n")
}

fn git_failure_hint(err: &anyhow::Error) -> Option<&'static str> {
    let kind = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<RepoError>())?
        .kind();
    match kind {
        FailureKind::Auth => Some("Check that your git credentials can read the fork"),
        FailureKind::Network => Some("Check your network connection, then run the checkout again"),
        FailureKind::NotFound => Some("The PR branch may have been deleted or renamed"),
        FailureKind::Other => None,
    }
}

/// One line describing which PR a branch belongs to.
pub fn provenance_line(branch: &str, provenance: Option<&PrProvenance>) -> String {
    match provenance {
        Some(p) => format!(
            "{BRANCH}{branch}{BRANCH:#} → {}/{}#{}",
            p.owner, p.repo, p.pr_id
        ),
        None => cformat!("{INFO_EMOJI} <bold>{branch}</> <dim>was not checked out from a PR</>"),
    }
}

/// Table of PR branches, one per line, branch names aligned.
pub fn pr_branch_table(branches: &[PrBranch]) -> String {
    if branches.is_empty() {
        return cformat!("{INFO_EMOJI} <dim>No PR branches</>");
    }
    let width = branches.iter().map(|b| b.branch.len()).max().unwrap_or(0);
    branches
        .iter()
        .map(|entry| {
            let branch = format!("{BRANCH}{:width$}{BRANCH:#}", entry.branch);
            match &entry.provenance {
                Ok(p) => format!("{branch}  {}/{}#{}", p.owner, p.repo, p.pr_id),
                Err(e) => format!("{branch}  {INVALID}{e}{INVALID:#}"),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
