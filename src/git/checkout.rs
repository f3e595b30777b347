//! Fork checkout state machine.
//!
//! Brings a local repository to the state where a PR's source branch is
//! checked out, tracks the fork, and records which PR it belongs to:
//!
//! ```text
//! Start ──▶ RemoteEnsured ──▶ Fetched ──▶ CheckedOut ──▶ ConfigPersisted ──▶ Done
//!   │            │               │             │                │
//!   └────────────┴───────────────┴─────────────┴────────────────┴──▶ CheckoutFailure
//!                                                                   { reached, error }
//! ```
//!
//! Each transition inspects the repository before changing it, so running the
//! checkout again after a failure (or after success) converges on the same
//! result without duplicating remotes or rewriting config.

use std::fmt;

use super::error::{CheckoutError, CheckoutFailure, RepoError};
use super::naming::{LocalBranchSpec, NamingScheme, remote_name};
use super::pull_request::PullRequestRecord;
use super::{CheckoutOptions, RefSpec, RepositoryOps, Upstream};

/// Progress marker for a checkout, without the data each state carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    Start,
    RemoteEnsured,
    Fetched,
    CheckedOut,
    ConfigPersisted,
    Done,
}

/// Checkout state, carrying what later transitions need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    Start,
    RemoteEnsured {
        spec: LocalBranchSpec,
    },
    Fetched {
        spec: LocalBranchSpec,
        /// Local branch tip before the fetch, if the branch existed.
        previous: Option<String>,
        fetched: String,
    },
    CheckedOut {
        spec: LocalBranchSpec,
        commit: String,
    },
    ConfigPersisted {
        spec: LocalBranchSpec,
        commit: String,
    },
    Done {
        spec: LocalBranchSpec,
        commit: String,
    },
}

impl CheckoutState {
    pub fn stage(&self) -> Stage {
        match self {
            CheckoutState::Start => Stage::Start,
            CheckoutState::RemoteEnsured { .. } => Stage::RemoteEnsured,
            CheckoutState::Fetched { .. } => Stage::Fetched,
            CheckoutState::CheckedOut { .. } => Stage::CheckedOut,
            CheckoutState::ConfigPersisted { .. } => Stage::ConfigPersisted,
            CheckoutState::Done { .. } => Stage::Done,
        }
    }
}

/// Something the user should know about that didn't stop the checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutWarning {
    /// The local branch had commits that aren't on the fork's branch. The
    /// branch was reset to the fetched commit; `previous` is the old tip.
    Diverged {
        branch: String,
        previous: String,
        fetched: String,
    },
    /// The branch was moved while tracked files had uncommitted edits. The
    /// edits were kept on top of the new commit.
    UncommittedChanges { branch: String },
}

impl fmt::Display for CheckoutWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutWarning::Diverged {
                branch,
                previous,
                fetched,
            } => write!(
                f,
                "Branch {branch} diverged from the PR; reset from {} to {}",
                short_sha(previous),
                short_sha(fetched)
            ),
            CheckoutWarning::UncommittedChanges { branch } => write!(
                f,
                "Kept uncommitted changes while updating {branch}; review them before committing"
            ),
        }
    }
}

/// Checkout settings that come from user configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// `--depth` for fetches; `None` lets git decide.
    pub fetch_depth: Option<u32>,
    /// Mark created remotes with `remote.<name>.<provider>-pr-remote = true`.
    pub mark_remotes: bool,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            fetch_depth: None,
            mark_remotes: true,
        }
    }
}

/// Outcome of a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReport {
    pub branch: String,
    pub remote: String,
    /// What the branch tracks, e.g. `you/my-branch`.
    pub upstream: Upstream,
    pub remote_created: bool,
    pub fetched_refspec: Option<RefSpec>,
    pub warnings: Vec<CheckoutWarning>,
    pub state: Stage,
    pub commit: String,
}

/// Drives one PR through the checkout states.
///
/// [`step`](Self::step) performs a single transition so callers (and tests)
/// can observe each state; [`run`](Self::run) steps until done.
pub struct ForkCheckout<'a, R: RepositoryOps + ?Sized> {
    repo: &'a R,
    pr: &'a mut PullRequestRecord,
    scheme: &'a NamingScheme,
    settings: CheckoutSettings,
    state: CheckoutState,
    remote_created: bool,
    fetched_refspec: Option<RefSpec>,
    warnings: Vec<CheckoutWarning>,
}

impl<'a, R: RepositoryOps + ?Sized> ForkCheckout<'a, R> {
    pub fn new(
        repo: &'a R,
        pr: &'a mut PullRequestRecord,
        scheme: &'a NamingScheme,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            repo,
            pr,
            scheme,
            settings,
            state: CheckoutState::Start,
            remote_created: false,
            fetched_refspec: None,
            warnings: Vec::new(),
        }
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn warnings(&self) -> &[CheckoutWarning] {
        &self.warnings
    }

    /// Perform the next transition and return the stage now reached.
    ///
    /// On failure the state is left where it was. Stepping from `Done` is a no-op.
    pub fn step(&mut self) -> Result<Stage, CheckoutFailure> {
        let next = match self.state.clone() {
            CheckoutState::Start => self.ensure_remote(),
            CheckoutState::RemoteEnsured { spec } => self.fetch(spec),
            CheckoutState::Fetched {
                spec,
                previous,
                fetched,
            } => self.check_out(spec, previous, fetched),
            CheckoutState::CheckedOut { spec, commit } => self.persist_config(spec, commit),
            CheckoutState::ConfigPersisted { spec, commit } => {
                self.pr.head.sha = commit.clone();
                Ok(CheckoutState::Done { spec, commit })
            }
            CheckoutState::Done { .. } => return Ok(Stage::Done),
        };

        match next {
            Ok(state) => {
                log::debug!(
                    "PR #{}: {} -> {}",
                    self.pr.id,
                    self.state.stage(),
                    state.stage()
                );
                self.state = state;
                Ok(self.state.stage())
            }
            Err(error) => Err(CheckoutFailure {
                reached: self.state.stage(),
                error,
            }),
        }
    }

    /// Step until `Done`.
    pub fn run(mut self) -> Result<CheckoutReport, CheckoutFailure> {
        loop {
            self.step()?;
            if let CheckoutState::Done { spec, commit } = self.state {
                return Ok(CheckoutReport {
                    upstream: spec.upstream(),
                    branch: spec.branch_name,
                    remote: spec.upstream_remote,
                    remote_created: self.remote_created,
                    fetched_refspec: self.fetched_refspec,
                    warnings: self.warnings,
                    state: Stage::Done,
                    commit,
                });
            }
        }
    }

    /// `Start -> RemoteEnsured`: find or add the fork's remote.
    fn ensure_remote(&mut self) -> Result<CheckoutState, CheckoutError> {
        if !self.pr.head.exists {
            return Err(CheckoutError::UnresolvedHead {
                pr_id: self.pr.id,
                owner: self.pr.head.owner.clone(),
                repo: self.pr.head.repo.clone(),
                ref_name: self.pr.head.ref_name.clone(),
            });
        }

        let fork = self.pr.head_endpoint()?;
        let remotes = self.repo.list_remotes().map_err(inspect("remotes"))?;

        if let Some(existing) = remotes.iter().find(|r| fork.matches_url(&r.url)) {
            log::debug!("Reusing remote {} for {fork}", existing.name);
            let spec = self.scheme.spec_for(self.pr, &existing.name)?;
            return Ok(CheckoutState::RemoteEnsured { spec });
        }

        let name = remote_name(&self.pr.head.owner, &fork, &remotes);
        // Validate names before the first write
        let spec = self.scheme.spec_for(self.pr, &name)?;

        self.repo
            .add_remote(&name, fork.url())
            .map_err(|source| CheckoutError::RemoteAdd {
                remote: name.clone(),
                source,
            })?;
        self.remote_created = true;
        log::debug!("Added remote {name} -> {}", fork.url());

        if self.settings.mark_remotes {
            let key = self.scheme.remote_marker_key(&name);
            self.repo
                .set_config(&key, "true")
                .map_err(|source| CheckoutError::ConfigWrite { key, source })?;
        }

        Ok(CheckoutState::RemoteEnsured { spec })
    }

    /// `RemoteEnsured -> Fetched`.
    fn fetch(&mut self, spec: LocalBranchSpec) -> Result<CheckoutState, CheckoutError> {
        let local_ref = spec.local_ref();
        let previous = self
            .repo
            .resolve_commit(&local_ref)
            .map_err(inspect(&local_ref))?;
        let configured = previous.is_some() && self.is_configured(&spec)?;

        let (refspec, fetched_ref) = if configured {
            (spec.tracking_refspec(), spec.tracking_ref())
        } else if previous.is_some() {
            (spec.fetch_refspec().forced(), local_ref)
        } else {
            (spec.fetch_refspec(), local_ref)
        };

        let fetch_error = |source| CheckoutError::Fetch {
            remote: spec.upstream_remote.clone(),
            refspec: refspec.to_string(),
            source,
        };
        self.repo
            .fetch(&spec.upstream_remote, &refspec, self.settings.fetch_depth)
            .map_err(fetch_error)?;
        let fetched = self
            .repo
            .resolve_commit(&fetched_ref)
            .map_err(inspect(&fetched_ref))?
            .ok_or_else(|| {
                fetch_error(RepoError::failed(
                    format!("git rev-parse --verify {fetched_ref}"),
                    format!("fatal: {fetched_ref} does not exist after fetch"),
                ))
            })?;

        self.fetched_refspec = Some(refspec);
        Ok(CheckoutState::Fetched {
            spec,
            previous,
            fetched,
        })
    }

    /// `Fetched -> CheckedOut`: switch to the branch, moving it to the fetched commit.
    fn check_out(
        &mut self,
        spec: LocalBranchSpec,
        previous: Option<String>,
        fetched: String,
    ) -> Result<CheckoutState, CheckoutError> {
        let reset_to = match previous {
            None => None,
            Some(previous) if previous == fetched => None,
            Some(previous) => {
                let fast_forward = self
                    .repo
                    .is_ancestor(&previous, &fetched)
                    .map_err(inspect(&spec.branch_name))?;
                if fast_forward {
                    log::debug!(
                        "Fast-forwarding {} to {}",
                        spec.branch_name,
                        short_sha(&fetched)
                    );
                } else {
                    let warning = CheckoutWarning::Diverged {
                        branch: spec.branch_name.clone(),
                        previous,
                        fetched: fetched.clone(),
                    };
                    log::warn!("{warning}");
                    self.warnings.push(warning);
                }
                Some(fetched.clone())
            }
        };

        if reset_to.is_some()
            && self
                .repo
                .has_uncommitted_changes()
                .map_err(inspect("working tree"))?
        {
            let warning = CheckoutWarning::UncommittedChanges {
                branch: spec.branch_name.clone(),
            };
            log::warn!("{warning}");
            self.warnings.push(warning);
        }

        let options = CheckoutOptions {
            create_if_missing: false,
            track: None,
            reset_to,
        };
        self.repo
            .checkout(&spec.branch_name, &options)
            .map_err(|source| CheckoutError::Checkout {
                branch: spec.branch_name.clone(),
                source,
            })?;

        Ok(CheckoutState::CheckedOut {
            spec,
            commit: fetched,
        })
    }

    /// `CheckedOut -> ConfigPersisted`: upstream tracking plus the provenance key.
    fn persist_config(
        &mut self,
        spec: LocalBranchSpec,
        commit: String,
    ) -> Result<CheckoutState, CheckoutError> {
        for (key, value) in desired_config(&spec) {
            let current = self.repo.get_config(&key).map_err(inspect(&key))?;
            if current.as_deref() == Some(value.as_str()) {
                continue;
            }
            self.repo
                .set_config(&key, &value)
                .map_err(|source| CheckoutError::ConfigWrite {
                    key: key.clone(),
                    source,
                })?;
        }
        Ok(CheckoutState::ConfigPersisted { spec, commit })
    }

    /// Whether a previous checkout of this PR fully completed.
    fn is_configured(&self, spec: &LocalBranchSpec) -> Result<bool, CheckoutError> {
        for (key, value) in desired_config(spec) {
            let current = self.repo.get_config(&key).map_err(inspect(&key))?;
            if current.as_deref() != Some(value.as_str()) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Check out `pr` into `repo`, running every transition.
pub fn checkout_pull_request<R: RepositoryOps + ?Sized>(
    repo: &R,
    pr: &mut PullRequestRecord,
    scheme: &NamingScheme,
    settings: CheckoutSettings,
) -> Result<CheckoutReport, CheckoutFailure> {
    ForkCheckout::new(repo, pr, scheme, settings).run()
}

fn desired_config(spec: &LocalBranchSpec) -> [(String, String); 3] {
    [
        (
            format!("branch.{}.remote", spec.branch_name),
            spec.upstream_remote.clone(),
        ),
        (format!("branch.{}.merge", spec.branch_name), spec.merge_ref()),
        (spec.config_key.clone(), spec.config_value.clone()),
    ]
}

fn inspect(what: &str) -> impl FnOnce(RepoError) -> CheckoutError + '_ {
    move |source| CheckoutError::Inspect {
        what: what.to_string(),
        source,
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}
