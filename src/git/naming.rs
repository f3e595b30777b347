//! Branch naming and the provenance config scheme.
//!
//! A checked-out PR is described by two things that survive a restart:
//!
//! ```text
//! branch:  pr/<author>/<id>                                 e.g. pr/me/100
//! config:  branch.<branch>.<provider>-pr-owner-number = <owner>#<repo>#<id>
//!          branch.pr/me/100.github-pr-owner-number   = you#bbb#100
//! ```
//!
//! The config format is read back by companion tooling, so it must stay
//! byte-for-byte stable. The provider defaults to `github` for the same reason,
//! whatever host the PR actually lives on.
//!
//! Remotes are named after the fork owner. When a remote of that name already
//! points somewhere else, a numeric suffix is appended (`you-2`, `you-3`, ...).

use super::error::{CheckoutError, MalformedConfig};
use super::pull_request::PullRequestRecord;
use super::url::RemoteEndpoint;
use super::{RefSpec, Remote, Upstream};

/// Provider tag used in config keys unless configured otherwise.
pub const DEFAULT_PROVIDER: &str = "github";

const BRANCH_PREFIX: &str = "pr";
const FIELD_SEPARATOR: char = '#';

/// The (fork owner, repository, PR number) triple a branch was created for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrProvenance {
    pub owner: String,
    pub repo: String,
    pub pr_id: u64,
}

/// Pick the remote name for a fork.
///
/// Returns `head_owner` unless a remote of that name already points at a
/// different repository; then the first of `head_owner-2`, `head_owner-3`, ...
/// that is free or already points at `fork`.
///
/// Callers look remotes up by URL first, so a fork that already has a
/// (possibly suffixed) remote never gets here twice.
pub fn remote_name(head_owner: &str, fork: &RemoteEndpoint, existing: &[Remote]) -> String {
    let usable = |candidate: &str| {
        existing
            .iter()
            .find(|remote| remote.name == candidate)
            .is_none_or(|remote| fork.matches_url(&remote.url))
    };

    if usable(head_owner) {
        return head_owner.to_string();
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{head_owner}-{suffix}");
        if usable(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Local branch name for a PR: `pr/<author>/<id>`.
///
/// The head ref name is deliberately not part of it: it can change while
/// the PR is open, and the PR id alone is unique per project.
pub fn branch_name(pr_id: u64, author_handle: &str) -> Result<String, CheckoutError> {
    check_ref_component(author_handle)?;
    Ok(format!("{BRANCH_PREFIX}/{author_handle}/{pr_id}"))
}

/// Provenance config key for a branch.
pub fn config_key(branch_name: &str, provider: &str) -> String {
    format!("branch.{branch_name}.{provider}-pr-owner-number")
}

/// Marker set on remotes this tool created.
pub fn remote_marker_key(remote: &str, provider: &str) -> String {
    format!("remote.{remote}.{provider}-pr-remote")
}

/// Provenance config value: `<owner>#<repo>#<id>`.
pub fn config_value(owner: &str, repo: &str, pr_id: u64) -> String {
    format!("{owner}{FIELD_SEPARATOR}{repo}{FIELD_SEPARATOR}{pr_id}")
}

/// Parse a provenance config value back into its triple.
///
/// Strict: exactly three non-empty `#`-separated fields, a positive id in
/// canonical decimal form (ASCII digits, no sign, no leading zero), and no
/// surrounding whitespace.
pub fn parse_config_value(value: &str) -> Result<PrProvenance, MalformedConfig> {
    let malformed = |reason| MalformedConfig {
        value: value.to_string(),
        reason,
    };

    if value.trim() != value {
        return Err(malformed("unexpected surrounding whitespace"));
    }

    let fields: Vec<&str> = value.split(FIELD_SEPARATOR).collect();
    let [owner, repo, id] = fields[..] else {
        return Err(malformed("expected <owner>#<repo>#<number>"));
    };
    if owner.is_empty() || repo.is_empty() {
        return Err(malformed("owner and repo must not be empty"));
    }
    let canonical =
        !id.is_empty() && !id.starts_with('0') && id.bytes().all(|b| b.is_ascii_digit());
    let pr_id = canonical
        .then(|| id.parse::<u64>().ok())
        .flatten()
        .ok_or_else(|| malformed("PR number must be a positive integer"))?;

    Ok(PrProvenance {
        owner: owner.to_string(),
        repo: repo.to_string(),
        pr_id,
    })
}

/// Everything the checkout writes for one PR, derived up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalBranchSpec {
    pub branch_name: String,
    pub upstream_remote: String,
    pub upstream_ref: String,
    pub config_key: String,
    pub config_value: String,
}

impl LocalBranchSpec {
    pub fn upstream(&self) -> Upstream {
        Upstream {
            remote: self.upstream_remote.clone(),
            branch: self.upstream_ref.clone(),
        }
    }

    /// Value of `branch.<name>.merge`.
    pub fn merge_ref(&self) -> String {
        format!("refs/heads/{}", self.upstream_ref)
    }

    /// Remote-tracking ref for the upstream branch.
    pub fn tracking_ref(&self) -> String {
        format!("refs/remotes/{}/{}", self.upstream_remote, self.upstream_ref)
    }

    /// The first-time fetch: `<headRef>:<branchName>`.
    pub fn fetch_refspec(&self) -> RefSpec {
        RefSpec::new(&self.upstream_ref, &self.branch_name)
    }

    /// The refresh fetch for an already-configured branch.
    pub fn tracking_refspec(&self) -> RefSpec {
        RefSpec::new(&self.upstream_ref, self.tracking_ref()).forced()
    }

    pub fn local_ref(&self) -> String {
        format!("refs/heads/{}", self.branch_name)
    }
}

/// Naming rules bound to a provider tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    provider: String,
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
        }
    }
}

impl NamingScheme {
    /// Provider tags end up inside config keys, so only `[a-z0-9-]` is allowed.
    pub fn new(provider: impl Into<String>) -> Result<Self, CheckoutError> {
        let provider = provider.into();
        let valid = !provider.is_empty()
            && provider
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(CheckoutError::InvalidName {
                name: provider,
                reason: "provider must be lowercase letters, digits or '-'",
            });
        }
        Ok(Self { provider })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn config_key(&self, branch_name: &str) -> String {
        config_key(branch_name, &self.provider)
    }

    pub fn remote_marker_key(&self, remote: &str) -> String {
        remote_marker_key(remote, &self.provider)
    }

    /// Derive the branch spec for `pr`, tracking `remote`.
    pub fn spec_for(
        &self,
        pr: &PullRequestRecord,
        remote: &str,
    ) -> Result<LocalBranchSpec, CheckoutError> {
        for field in [&pr.head.owner, &pr.head.repo] {
            if field.is_empty() || field.contains(FIELD_SEPARATOR) {
                return Err(CheckoutError::InvalidName {
                    name: field.clone(),
                    reason: "owner and repo must be non-empty and must not contain '#'",
                });
            }
        }

        let branch_name = branch_name(pr.id, &pr.author_handle)?;
        Ok(LocalBranchSpec {
            config_key: self.config_key(&branch_name),
            config_value: config_value(&pr.head.owner, &pr.head.repo, pr.id),
            upstream_remote: remote.to_string(),
            upstream_ref: pr.head.ref_name.clone(),
            branch_name,
        })
    }
}

/// Reject names git won't accept as one path component of a ref.
fn check_ref_component(name: &str) -> Result<(), CheckoutError> {
    let invalid = |reason| {
        Err(CheckoutError::InvalidName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("must not be empty");
    }
    if name.starts_with('.') || name.ends_with('.') || name.ends_with(".lock") {
        return invalid("must not start or end with '.' or end with '.lock'");
    }
    if name.contains("..") || name.contains("@{") || name == "@" {
        return invalid("must not contain '..' or '@{'");
    }
    if name
        .chars()
        .any(|c| c.is_ascii_control() || c.is_whitespace() || "~^:?*[\\/".contains(c))
    {
        return invalid("contains a character git forbids in branch names");
    }
    Ok(())
}
