//! Error types for PR checkout.
//!
//! Input normalization errors ([`MalformedUrl`], [`MalformedConfig`]) are
//! small structs so the pure naming and parsing functions can return them
//! directly. [`RepoError`] and [`ApiError`] come from the two external
//! capabilities. [`CheckoutError`] is the taxonomy the orchestrator reports,
//! and [`CheckoutFailure`] pairs it with the state that was reached.

use std::fmt;

use super::checkout::Stage;

/// A clone URL that doesn't match any recognized shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedUrl {
    pub url: String,
}

impl fmt::Display for MalformedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Malformed clone URL: {:?}", self.url)
    }
}

impl std::error::Error for MalformedUrl {}

/// A provenance config value that isn't `<owner>#<repo>#<id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedConfig {
    pub value: String,
    pub reason: &'static str,
}

impl fmt::Display for MalformedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Malformed PR config value {:?}: {}",
            self.value, self.reason
        )
    }
}

impl std::error::Error for MalformedConfig {}

/// The hosting API could not be reached or answered with an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hosting API unavailable: {}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Broad category of a failed git operation, classified from its stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum FailureKind {
    Network,
    Auth,
    NotFound,
    Other,
}

impl FailureKind {
    /// Classify git's stderr. Anything unrecognized is `Other`.
    pub fn classify(stderr: &str) -> Self {
        let lower = stderr.to_lowercase();
        if lower.contains("authentication")
            || lower.contains("permission denied")
            || lower.contains("could not read username")
            || lower.contains("401")
            || lower.contains("403")
        {
            FailureKind::Auth
        } else if lower.contains("couldn't find remote ref")
            || lower.contains("not found")
            || lower.contains("does not exist")
            || lower.contains("did not match any")
            || lower.contains("404")
        {
            FailureKind::NotFound
        } else if lower.contains("could not resolve host")
            || lower.contains("unable to access")
            || lower.contains("connection")
            || lower.contains("timed out")
            || lower.contains("network")
        {
            FailureKind::Network
        } else {
            FailureKind::Other
        }
    }
}

/// A repository operation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    /// The command could not be started at all (e.g., git not installed).
    Spawn { command: String, message: String },
    /// The command ran and exited unsuccessfully.
    Failed {
        command: String,
        kind: FailureKind,
        stderr: String,
    },
}

impl RepoError {
    pub fn failed(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        let stderr = stderr.into();
        RepoError::Failed {
            command: command.into(),
            kind: FailureKind::classify(&stderr),
            stderr,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            RepoError::Spawn { .. } => FailureKind::Other,
            RepoError::Failed { kind, .. } => *kind,
        }
    }
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoError::Spawn { command, message } => {
                write!(f, "Failed to run `{command}`: {message}")
            }
            RepoError::Failed {
                command, stderr, ..
            } => {
                let stderr = stderr.trim();
                if stderr.is_empty() {
                    write!(f, "`{command}` failed")
                } else {
                    write!(f, "`{command}` failed: {stderr}")
                }
            }
        }
    }
}

impl std::error::Error for RepoError {}

/// Everything that can stop a PR checkout.
#[derive(Debug)]
pub enum CheckoutError {
    MalformedUrl(MalformedUrl),
    MalformedConfig(MalformedConfig),
    /// The hosting-API payload is missing or has unusable fields.
    MalformedPayload(String),
    /// A name that would produce an invalid git ref or config key.
    InvalidName { name: String, reason: &'static str },
    ApiUnavailable(ApiError),
    /// The PR's source branch (or its fork) no longer exists.
    UnresolvedHead {
        pr_id: u64,
        owner: String,
        repo: String,
        ref_name: String,
    },
    /// Reading remotes, refs or config failed.
    Inspect { what: String, source: RepoError },
    RemoteAdd { remote: String, source: RepoError },
    Fetch {
        remote: String,
        refspec: String,
        source: RepoError,
    },
    Checkout { branch: String, source: RepoError },
    ConfigWrite { key: String, source: RepoError },
}

impl fmt::Display for CheckoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutError::MalformedUrl(e) => e.fmt(f),
            CheckoutError::MalformedConfig(e) => e.fmt(f),
            CheckoutError::MalformedPayload(msg) => write!(f, "Malformed PR payload: {msg}"),
            CheckoutError::InvalidName { name, reason } => {
                write!(f, "Invalid name {name:?}: {reason}")
            }
            CheckoutError::ApiUnavailable(e) => e.fmt(f),
            CheckoutError::UnresolvedHead {
                pr_id,
                owner,
                repo,
                ref_name,
            } => write!(
                f,
                "Cannot checkout PR #{pr_id}: branch {ref_name} no longer exists in {owner}/{repo}"
            ),
            CheckoutError::Inspect { what, source } => {
                write!(f, "Failed to read {what}: {source}")
            }
            CheckoutError::RemoteAdd { remote, source } => {
                write!(f, "Failed to add remote {remote}: {source}")
            }
            CheckoutError::Fetch {
                remote,
                refspec,
                source,
            } => write!(f, "Failed to fetch {refspec} from {remote}: {source}"),
            CheckoutError::Checkout { branch, source } => {
                write!(f, "Failed to check out {branch}: {source}")
            }
            CheckoutError::ConfigWrite { key, source } => {
                write!(f, "Failed to write {key}: {source}")
            }
        }
    }
}

impl std::error::Error for CheckoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CheckoutError::MalformedUrl(e) => Some(e),
            CheckoutError::MalformedConfig(e) => Some(e),
            CheckoutError::ApiUnavailable(e) => Some(e),
            CheckoutError::Inspect { source, .. }
            | CheckoutError::RemoteAdd { source, .. }
            | CheckoutError::Fetch { source, .. }
            | CheckoutError::Checkout { source, .. }
            | CheckoutError::ConfigWrite { source, .. } => Some(source),
            CheckoutError::MalformedPayload(_)
            | CheckoutError::InvalidName { .. }
            | CheckoutError::UnresolvedHead { .. } => None,
        }
    }
}

impl From<MalformedUrl> for CheckoutError {
    fn from(e: MalformedUrl) -> Self {
        CheckoutError::MalformedUrl(e)
    }
}

impl From<MalformedConfig> for CheckoutError {
    fn from(e: MalformedConfig) -> Self {
        CheckoutError::MalformedConfig(e)
    }
}

impl From<ApiError> for CheckoutError {
    fn from(e: ApiError) -> Self {
        CheckoutError::ApiUnavailable(e)
    }
}

/// An orchestrator run that stopped early.
///
/// `reached` is the last state that fully completed. Every state is safe to
/// resume from, so a caller can simply invoke the checkout again.
#[derive(Debug)]
pub struct CheckoutFailure {
    pub reached: Stage,
    pub error: CheckoutError,
}

impl fmt::Display for CheckoutFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (stopped after {})", self.error, self.reached)
    }
}

impl std::error::Error for CheckoutFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Check if an error chain contains an unresolved PR head.
///
/// The CLI exits with a distinct code for this case.
pub fn is_unresolved_head(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<CheckoutError>()
            .is_some_and(|e| matches!(e, CheckoutError::UnresolvedHead { .. }))
    })
}
