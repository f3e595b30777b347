//! Hosting API access through the GitHub CLI.
//!
//! `gh api` handles authentication and host selection (including GitHub
//! Enterprise) so we only deal with JSON. `{owner}/{repo}` placeholders are
//! resolved by `gh` from the repository's remotes.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::Deserialize;

use crate::git::{ApiError, HeadRefResolver, RawPullRequest, RemoteEndpoint, ResolvedHeadRef};
use crate::shell_exec::Cmd;

/// Why a `gh api` call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum GhFailure {
    NotInstalled,
    NotFound,
    NotAuthenticated,
    RateLimited,
    Network,
    Other(String),
}

impl GhFailure {
    /// Classify `gh api` stderr.
    fn classify(stderr: &str) -> Self {
        let lower = stderr.to_lowercase();
        if lower.contains("not found") || lower.contains("404") {
            GhFailure::NotFound
        } else if lower.contains("authentication")
            || lower.contains("logged in")
            || lower.contains("auth login")
            || lower.contains("not logged")
            || lower.contains("401")
        {
            GhFailure::NotAuthenticated
        } else if lower.contains("rate limit") || lower.contains("403") {
            GhFailure::RateLimited
        } else if lower.contains("network")
            || lower.contains("connection")
            || lower.contains("timeout")
        {
            GhFailure::Network
        } else {
            GhFailure::Other(stderr.trim().to_string())
        }
    }

    fn message(&self, what: &str) -> String {
        match self {
            GhFailure::NotInstalled => {
                "GitHub CLI (gh) not installed; install from https://cli.github.com/".to_string()
            }
            GhFailure::NotFound => format!("{what} not found"),
            GhFailure::NotAuthenticated => {
                "GitHub CLI not authenticated; run gh auth login".to_string()
            }
            GhFailure::RateLimited => {
                "GitHub API rate limit exceeded; wait a few minutes and retry".to_string()
            }
            GhFailure::Network => {
                "Network error connecting to GitHub; check your internet connection".to_string()
            }
            GhFailure::Other(stderr) if stderr.is_empty() => format!("gh api failed for {what}"),
            GhFailure::Other(stderr) => format!("gh api failed for {what}: {stderr}"),
        }
    }
}

/// Run `gh api <path>` in `repo_root` and return stdout.
fn gh_api(api_path: &str, repo_root: &Path) -> Result<Vec<u8>, GhFailure> {
    let output = Cmd::new("gh")
        .args(["api", api_path])
        .current_dir(repo_root)
        .context(repo_root.display().to_string())
        .env("GH_PROMPT_DISABLED", "1")
        .run()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GhFailure::NotInstalled,
            _ => GhFailure::Other(e.to_string()),
        })?;

    if !output.status.success() {
        return Err(GhFailure::classify(&String::from_utf8_lossy(&output.stderr)));
    }
    Ok(output.stdout)
}

/// Fetch the raw PR object for `number` from the repository `gh` resolves in `repo_root`.
pub fn fetch_pull_request(number: u64, repo_root: &Path) -> anyhow::Result<RawPullRequest> {
    let api_path = format!("repos/{{owner}}/{{repo}}/pulls/{number}");
    let stdout = gh_api(&api_path, repo_root).map_err(|failure| {
        let hint = match failure {
            GhFailure::NotFound => {
                "; run gh repo set-default --view to check which repo is being queried"
            }
            _ => "",
        };
        anyhow::anyhow!("{}{hint}", failure.message(&format!("PR #{number}")))
    })?;

    let payload: RawPullRequest = serde_json::from_slice(&stdout).with_context(|| {
        format!(
            "Failed to parse GitHub API response for PR #{number}. \
             This may indicate a GitHub API change."
        )
    })?;
    if payload.number != number {
        bail!("GitHub returned PR #{} when asked for #{number}", payload.number);
    }
    Ok(payload)
}

#[derive(Debug, Deserialize)]
struct GhRepository {
    clone_url: String,
}

#[derive(Debug, Deserialize)]
struct GhBranch {
    name: String,
    commit: GhCommit,
}

#[derive(Debug, Deserialize)]
struct GhCommit {
    sha: String,
}

/// Resolves fork branches with `gh api`.
///
/// Holds only the directory `gh` runs in, so it can be shared freely.
#[derive(Debug, Clone)]
pub struct GhResolver {
    repo_root: PathBuf,
}

impl GhResolver {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }
}

impl HeadRefResolver for GhResolver {
    fn resolve_head_ref(
        &self,
        owner: &str,
        repo: &str,
        ref_name: &str,
    ) -> Result<ResolvedHeadRef, ApiError> {
        let gone = || ResolvedHeadRef {
            ref_name: ref_name.to_string(),
            sha: String::new(),
            exists: false,
            repo: None,
        };

        let what = format!("{owner}/{repo}");
        let stdout = match gh_api(&format!("repos/{owner}/{repo}"), &self.repo_root) {
            Ok(stdout) => stdout,
            Err(GhFailure::NotFound) => {
                log::debug!("Fork {what} no longer exists");
                return Ok(gone());
            }
            Err(failure) => return Err(ApiError::new(failure.message(&what))),
        };
        let repository: GhRepository = serde_json::from_slice(&stdout)
            .map_err(|e| ApiError::new(format!("Unexpected response for {what}: {e}")))?;
        let endpoint = RemoteEndpoint::parse(&repository.clone_url)
            .map_err(|e| ApiError::new(e.to_string()))?;

        let api_path = format!(
            "repos/{owner}/{repo}/branches/{}",
            urlencoding::encode(ref_name)
        );
        let what = format!("branch {ref_name} in {owner}/{repo}");
        let branch: GhBranch = match gh_api(&api_path, &self.repo_root) {
            Ok(stdout) => serde_json::from_slice(&stdout)
                .map_err(|e| ApiError::new(format!("Unexpected response for {what}: {e}")))?,
            Err(GhFailure::NotFound) => {
                log::debug!("{what} no longer exists");
                return Ok(ResolvedHeadRef {
                    repo: Some(endpoint),
                    ..gone()
                });
            }
            Err(failure) => return Err(ApiError::new(failure.message(&what))),
        };

        Ok(ResolvedHeadRef {
            ref_name: branch.name,
            sha: branch.commit.sha,
            exists: true,
            repo: Some(endpoint),
        })
    }
}
