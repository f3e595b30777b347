//! Pull request normalization.
//!
//! The hosting API hands back loosely structured PR objects: ref names may or
//! may not carry a `refs/heads/` prefix, the head repository may be missing
//! (fork deleted) or differ from the base (fork PR). [`PullRequestRecord`] is
//! the one shape the checkout works from.
//!
//! ```text
//! RawPullRequest
//!   │
//!   ├─── head.repo == base.repo ───▶ Same-repo PR: head taken from payload
//!   │
//!   ├─── head.repo == null ────────▶ Fork deleted: head.exists = false
//!   │
//!   └─── head.repo != base.repo ───▶ Fork PR: HeadRefResolver::resolve_head_ref
//!                                    (one API call, never retried here)
//! ```

use serde::{Deserialize, Serialize};

use super::error::{ApiError, CheckoutError};
use super::url::RemoteEndpoint;

/// Raw JSON shape of a PR from the hosting API
/// (`gh api repos/{owner}/{repo}/pulls/{number}`). Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPullRequest {
    pub number: u64,
    #[serde(default)]
    pub user: Option<RawUser>,
    pub head: RawRef,
    pub base: RawRef,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawUser {
    pub login: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    #[serde(default)]
    pub sha: Option<String>,
    /// Owner of the ref; still present when `repo` is null.
    #[serde(default)]
    pub user: Option<RawUser>,
    /// The repository for this ref. Can be `null` if the fork was deleted.
    #[serde(default)]
    pub repo: Option<RawRepository>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRepository {
    pub name: String,
    pub owner: RawUser,
    #[serde(default)]
    pub clone_url: Option<String>,
}

/// What the hosting API knows about a PR's source branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHeadRef {
    pub ref_name: String,
    /// Empty when the branch doesn't exist or the API didn't report it.
    pub sha: String,
    pub exists: bool,
    pub repo: Option<RemoteEndpoint>,
}

/// Looks up a branch in the (fork) repository a PR comes from.
///
/// Backed by a hosting-API client. Implementations hold no per-call state,
/// so one resolver can serve concurrent checkouts of different PRs.
pub trait HeadRefResolver {
    fn resolve_head_ref(
        &self,
        owner: &str,
        repo: &str,
        ref_name: &str,
    ) -> Result<ResolvedHeadRef, ApiError>;
}

impl<F> HeadRefResolver for F
where
    F: Fn(&str, &str, &str) -> Result<ResolvedHeadRef, ApiError>,
{
    fn resolve_head_ref(
        &self,
        owner: &str,
        repo: &str,
        ref_name: &str,
    ) -> Result<ResolvedHeadRef, ApiError> {
        self(owner, repo, ref_name)
    }
}

/// One side (head or base) of a PR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub ref_name: String,
    pub sha: String,
    /// `false` means the ref is gone on the host. Terminal: don't retry.
    pub exists: bool,
    pub remote_hint: Option<RemoteEndpoint>,
}

/// A PR normalized for checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRecord {
    pub id: u64,
    pub author_handle: String,
    pub head: PullRequestRef,
    pub base: PullRequestRef,
    /// Whether the head lives in a different repository than the base.
    pub is_cross_repository: bool,
}

impl PullRequestRecord {
    /// Normalize a raw payload, resolving the head through `resolver` for fork PRs.
    pub fn from_raw_payload(
        payload: &RawPullRequest,
        resolver: &dyn HeadRefResolver,
    ) -> Result<Self, CheckoutError> {
        let malformed = |msg: &str| CheckoutError::MalformedPayload(msg.to_string());

        if payload.number == 0 {
            return Err(malformed("PR number must be positive"));
        }
        let author_handle = payload
            .user
            .as_ref()
            .map(|u| u.login.clone())
            .filter(|login| !login.is_empty())
            .ok_or_else(|| malformed("PR author is missing"))?;

        let base_repo = payload
            .base
            .repo
            .as_ref()
            .ok_or_else(|| malformed("PR base repository is missing"))?;
        let base_ref = strip_ref_prefix(&payload.base.ref_name);
        let head_ref = strip_ref_prefix(&payload.head.ref_name);
        if base_ref.is_empty() || head_ref.is_empty() {
            return Err(malformed("PR has an empty branch name"));
        }

        let base_endpoint = repository_endpoint(base_repo)?;
        let base = PullRequestRef {
            owner: base_repo.owner.login.clone(),
            repo: base_repo.name.clone(),
            ref_name: base_ref.to_string(),
            sha: payload.base.sha.clone().unwrap_or_default(),
            exists: true,
            remote_hint: base_endpoint.clone(),
        };

        let Some(head_repo) = payload.head.repo.as_ref() else {
            log::debug!("PR #{}: head repository is gone", payload.number);
            let owner = payload
                .head
                .user
                .as_ref()
                .map(|u| u.login.clone())
                .unwrap_or_default();
            return Ok(Self {
                id: payload.number,
                author_handle,
                head: PullRequestRef {
                    owner,
                    repo: base.repo.clone(),
                    ref_name: head_ref.to_string(),
                    sha: String::new(),
                    exists: false,
                    remote_hint: None,
                },
                base,
                is_cross_repository: true,
            });
        };

        let head_endpoint = repository_endpoint(head_repo)?;
        let is_cross_repository = match (&head_endpoint, &base_endpoint) {
            (Some(head), Some(base)) => head != base,
            // Owner/repo names are case-insensitive on every host we know of
            _ => {
                !head_repo
                    .owner
                    .login
                    .eq_ignore_ascii_case(&base_repo.owner.login)
                    || !head_repo.name.eq_ignore_ascii_case(&base_repo.name)
            }
        };

        let head = if is_cross_repository {
            log::debug!(
                "PR #{}: resolving {} in fork {}/{}",
                payload.number,
                head_ref,
                head_repo.owner.login,
                head_repo.name
            );
            let resolved =
                resolver.resolve_head_ref(&head_repo.owner.login, &head_repo.name, head_ref)?;
            let remote_hint = resolved.repo.or(head_endpoint);
            let (owner, repo) = match &remote_hint {
                Some(endpoint) => (endpoint.owner().to_string(), endpoint.repo().to_string()),
                None => (head_repo.owner.login.clone(), head_repo.name.clone()),
            };
            let ref_name = match strip_ref_prefix(&resolved.ref_name) {
                "" => head_ref.to_string(),
                name => name.to_string(),
            };
            PullRequestRef {
                owner,
                repo,
                ref_name,
                sha: resolved.sha,
                exists: resolved.exists,
                remote_hint,
            }
        } else {
            PullRequestRef {
                owner: base.owner.clone(),
                repo: base.repo.clone(),
                ref_name: head_ref.to_string(),
                sha: payload.head.sha.clone().unwrap_or_default(),
                exists: true,
                remote_hint: base_endpoint,
            }
        };

        Ok(Self {
            id: payload.number,
            author_handle,
            head,
            base,
            is_cross_repository,
        })
    }

    /// Whether the head can be checked out and its commit is known.
    ///
    /// Re-evaluated on every call: the checkout fills in the sha after fetching.
    pub fn is_resolved(&self) -> bool {
        self.head.exists && !self.head.sha.is_empty()
    }

    /// Clone URL of the head repository.
    ///
    /// Falls back to the base repository's host and protocol with the head's
    /// owner/repo when the API gave no URL.
    pub fn head_endpoint(&self) -> Result<RemoteEndpoint, CheckoutError> {
        if let Some(hint) = &self.head.remote_hint {
            return Ok(hint.clone());
        }
        let reference = self.base.remote_hint.as_ref().ok_or_else(|| {
            CheckoutError::MalformedPayload(format!(
                "PR #{} has no clone URL for its head or base repository",
                self.id
            ))
        })?;
        Ok(reference.fork_of(&self.head.owner, &self.head.repo)?)
    }
}

/// Strip the `refs/heads/` prefix from a ref string.
///
/// Some hosting APIs emit the malformed `ref/heads/` variant; it is accepted
/// too. Anything else is returned unchanged, so `feature/x` stays intact.
pub fn strip_ref_prefix(ref_name: &str) -> &str {
    let ref_name = ref_name.trim();
    ref_name
        .strip_prefix("refs/heads/")
        .or_else(|| ref_name.strip_prefix("ref/heads/"))
        .unwrap_or(ref_name)
}

fn repository_endpoint(repo: &RawRepository) -> Result<Option<RemoteEndpoint>, CheckoutError> {
    repo.clone_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .map(RemoteEndpoint::parse)
        .transpose()
        .map_err(CheckoutError::from)
}
