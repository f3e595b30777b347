//! Clone URL parsing.
//!
//! Parses clone URLs into a [`RemoteEndpoint`] (host, owner, repo) and derives
//! the comparison key used to decide whether two remotes point at the same
//! repository. Supports HTTPS, SSH, and scp-like (`git@host:path`) forms.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::error::MalformedUrl;

const URL_SCHEMES: [&str; 5] = ["https://", "http://", "git://", "ssh://", "file://"];

/// Host recorded for `file://` URLs, which have an empty authority.
const LOCAL_HOST: &str = "localhost";

/// Azure Repos puts `_git` between the project and the repository name.
const AZURE_REPO_MARKER: &str = "_git";

/// A repository location parsed from a clone URL.
///
/// # Supported URL formats
///
/// - `https://[user@]<host>/<namespace...>/<owner>/<repo>[.git]`
/// - `http://<host>/<owner>/<repo>[.git]`
/// - `git://<host>/<owner>/<repo>[.git]`
/// - `ssh://[user@]<host>/<owner>/<repo>[.git]`
/// - `[user@]<host>:<owner>/<repo>[.git]`
/// - `file:///<dir...>/<owner>/<repo>[.git]` (host is `localhost`)
///
/// Equality and hashing use [`RemoteEndpoint::normalize`], so the same
/// repository reached over HTTPS and SSH compares equal.
#[derive(Debug, Clone)]
pub struct RemoteEndpoint {
    url: String,
    host: String,
    path: Vec<String>,
    owner: String,
    repo: String,
}

impl RemoteEndpoint {
    /// Parse a clone URL.
    pub fn parse(url: &str) -> Result<Self, MalformedUrl> {
        let malformed = || MalformedUrl {
            url: url.to_string(),
        };
        let trimmed = url.trim();

        let (host, raw_path) = split_host_and_path(trimmed).ok_or_else(malformed)?;

        let raw_path = raw_path.trim_end_matches('/');
        let raw_path = raw_path.strip_suffix(".git").unwrap_or(raw_path);
        let path: Vec<String> = raw_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        let (repo, rest) = path.split_last().ok_or_else(malformed)?;
        let owner = match rest {
            [.., owner, marker] if marker == AZURE_REPO_MARKER => owner.clone(),
            [.., marker] if marker == AZURE_REPO_MARKER => return Err(malformed()),
            [.., owner] => owner.clone(),
            [] => return Err(malformed()),
        };
        let repo = repo.clone();

        if host.is_empty() || host.chars().any(char::is_whitespace) {
            return Err(malformed());
        }
        if path.iter().any(|s| s.chars().any(char::is_whitespace)) {
            return Err(malformed());
        }

        Ok(Self {
            url: trimmed.to_string(),
            host: host.to_string(),
            path,
            owner,
            repo,
        })
    }

    /// The URL exactly as given, minus surrounding whitespace.
    ///
    /// This is what gets written to `remote.<name>.url`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The host (e.g., "github.com", "dev.azure.com").
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The repository owner (e.g., "you"). For Azure Repos URLs this is the project.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The repository name without `.git` suffix.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Canonical comparison key: `host/path`.
    ///
    /// Insensitive to scheme, credentials, a trailing slash, a `.git` suffix,
    /// and the case of the host.
    pub fn normalize(&self) -> String {
        format!("{}/{}", self.host.to_ascii_lowercase(), self.path.join("/"))
    }

    /// Endpoint for `owner/repo` on the same host, reached the same way as this one.
    ///
    /// Used when the hosting API names a fork but gives no clone URL for it.
    pub fn fork_of(&self, owner: &str, repo: &str) -> Result<RemoteEndpoint, MalformedUrl> {
        let url = if self.url.starts_with("file://") {
            let parent = &self.path[..self.path.len().saturating_sub(2)];
            let mut segments: Vec<&str> = parent.iter().map(String::as_str).collect();
            segments.extend([owner, repo]);
            format!("file:///{}", segments.join("/"))
        } else if self.url.starts_with("https://") || self.url.starts_with("http://") {
            format!("https://{}/{owner}/{repo}.git", self.host)
        } else {
            format!("git@{}:{owner}/{repo}.git", self.host)
        };
        RemoteEndpoint::parse(&url)
    }

    /// Check whether this endpoint and the given URL point at the same repository.
    ///
    /// Unparseable URLs never match.
    pub fn matches_url(&self, url: &str) -> bool {
        RemoteEndpoint::parse(url).is_ok_and(|other| other == *self)
    }
}

impl PartialEq for RemoteEndpoint {
    fn eq(&self, other: &Self) -> bool {
        self.normalize() == other.normalize()
    }
}

impl Eq for RemoteEndpoint {}

impl Hash for RemoteEndpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalize().hash(state);
    }
}

impl fmt::Display for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.owner, self.repo, self.url)
    }
}

/// Split a URL into host and path, dropping scheme and credentials.
fn split_host_and_path(url: &str) -> Option<(&str, &str)> {
    for scheme in URL_SCHEMES {
        if let Some(rest) = url.strip_prefix(scheme) {
            let (authority, path) = rest.split_once('/')?;
            let host = authority.rsplit('@').next()?;
            if scheme == "file://" && host.is_empty() {
                return Some((LOCAL_HOST, path));
            }
            return Some((host, path));
        }
    }

    // Any other scheme is unsupported
    if url.contains("://") {
        return None;
    }

    // scp-like: [user@]host:path
    let (authority, path) = url.split_once(':')?;
    if authority.contains('/') {
        return None;
    }
    let host = authority.rsplit('@').next()?;
    Some((host, path))
}
