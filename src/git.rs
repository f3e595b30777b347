//! Git-facing side of PR checkout.
//!
//! [`RepositoryOps`] is the seam between the checkout state machine and the
//! repository it mutates. [`GitRepository`] implements it over the `git`
//! executable; tests use an in-memory implementation.

use std::fmt;

mod checkout;
mod error;
mod naming;
mod provenance;
mod pull_request;
mod repository;
mod url;

pub use checkout::{
    CheckoutReport, CheckoutSettings, CheckoutState, CheckoutWarning, ForkCheckout, Stage,
    checkout_pull_request,
};
pub use error::{
    ApiError, CheckoutError, CheckoutFailure, FailureKind, MalformedConfig, MalformedUrl,
    RepoError, is_unresolved_head,
};
pub use naming::{
    DEFAULT_PROVIDER, LocalBranchSpec, NamingScheme, PrProvenance, branch_name, config_key,
    config_value, parse_config_value, remote_marker_key, remote_name,
};
pub use provenance::{PrBranch, is_remote_created_for_pr, pr_branches, pr_for_branch};
pub use pull_request::{
    HeadRefResolver, PullRequestRecord, PullRequestRef, RawPullRequest, RawRef, RawRepository,
    RawUser, ResolvedHeadRef, strip_ref_prefix,
};
pub use repository::GitRepository;
pub use url::RemoteEndpoint;

/// A configured remote: its name and fetch URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    pub name: String,
    pub url: String,
}

impl Remote {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A fetch instruction `[+]<src>:<dst>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSpec {
    pub src: String,
    pub dst: String,
    /// Allow non-fast-forward updates of `dst` (the leading `+`).
    pub force: bool,
}

impl RefSpec {
    pub fn new(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            force: false,
        }
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

impl fmt::Display for RefSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plus = if self.force { "+" } else { "" };
        write!(f, "{plus}{}:{}", self.src, self.dst)
    }
}

/// The remote branch a local branch pulls from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub remote: String,
    pub branch: String,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.remote, self.branch)
    }
}

/// Options for [`RepositoryOps::checkout`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutOptions {
    /// Create the branch from `reset_to` (or HEAD) if it doesn't exist.
    pub create_if_missing: bool,
    /// Configure this upstream while checking out.
    pub track: Option<Upstream>,
    /// After switching, move the branch to this commit. Uncommitted changes
    /// are kept; the move fails instead of overwriting them.
    pub reset_to: Option<String>,
}

/// Repository operations the checkout needs.
///
/// Every method blocks until git has committed its change (or definitely
/// failed). Implementations don't lock; callers serialize checkouts per
/// repository.
pub trait RepositoryOps {
    fn list_remotes(&self) -> Result<Vec<Remote>, RepoError>;

    fn add_remote(&self, name: &str, url: &str) -> Result<(), RepoError>;

    /// Fetch `refspec` from `remote`. `depth` of `None` leaves history depth to git.
    fn fetch(&self, remote: &str, refspec: &RefSpec, depth: Option<u32>) -> Result<(), RepoError>;

    fn checkout(&self, branch: &str, options: &CheckoutOptions) -> Result<(), RepoError>;

    /// Read a config value; `Ok(None)` when the key is unset.
    fn get_config(&self, key: &str) -> Result<Option<String>, RepoError>;

    fn set_config(&self, key: &str, value: &str) -> Result<(), RepoError>;

    /// All `(key, value)` config entries whose key matches the regex `pattern`.
    fn config_entries(&self, pattern: &str) -> Result<Vec<(String, String)>, RepoError>;

    /// Whether tracked files have uncommitted changes (staged or not).
    fn has_uncommitted_changes(&self) -> Result<bool, RepoError>;

    /// Commit SHA a revision points at; `Ok(None)` when it doesn't resolve.
    fn resolve_commit(&self, rev: &str) -> Result<Option<String>, RepoError>;

    /// Whether `ancestor` is reachable from `descendant`.
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, RepoError>;

    /// The checked-out branch, or `None` on a detached HEAD.
    fn current_branch(&self) -> Result<Option<String>, RepoError>;
}
