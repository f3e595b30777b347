//! [`RepositoryOps`] over the `git` executable.

use std::path::PathBuf;
use std::process::Output;

use super::error::RepoError;
use super::{CheckoutOptions, RefSpec, Remote, RepositoryOps};
use crate::shell_exec::Cmd;

/// A local repository, operated on by running `git` in its directory.
#[derive(Debug, Clone)]
pub struct GitRepository {
    path: PathBuf,
    envs: Vec<(String, String)>,
}

impl GitRepository {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            envs: Vec::new(),
        }
    }

    /// Set an environment variable for every git invocation.
    pub fn with_env(mut self, key: impl Into<String>, val: impl Into<String>) -> Self {
        self.envs.push((key.into(), val.into()));
        self
    }

    /// Top-level directory of the working tree; fails outside a repository.
    pub fn worktree_root(&self) -> Result<PathBuf, RepoError> {
        let stdout = self.run_command(&["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(stdout.trim()))
    }

    /// Run a git command and return its stdout; a non-zero exit is an error.
    pub fn run_command(&self, args: &[&str]) -> Result<String, RepoError> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(RepoError::failed(
                command_line(args),
                String::from_utf8_lossy(&output.stderr),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a git command, leaving exit-status handling to the caller.
    fn output(&self, args: &[&str]) -> Result<Output, RepoError> {
        let mut cmd = Cmd::new("git")
            .args(args.iter().copied())
            .current_dir(&self.path)
            .context(self.path.display().to_string());
        for (key, val) in &self.envs {
            cmd = cmd.env(key, val);
        }
        cmd.run().map_err(|e| RepoError::Spawn {
            command: command_line(args),
            message: e.to_string(),
        })
    }
}

fn command_line(args: &[&str]) -> String {
    format!("git {}", args.join(" "))
}

impl RepositoryOps for GitRepository {
    fn list_remotes(&self) -> Result<Vec<Remote>, RepoError> {
        // Exit code 1 means no remote has a URL configured
        let args = ["config", "--get-regexp", r"^remote\..+\.url$"];
        let output = self.output(&args)?;
        match output.status.code() {
            Some(0) => {}
            Some(1) => return Ok(Vec::new()),
            _ => {
                return Err(RepoError::failed(
                    command_line(&args),
                    String::from_utf8_lossy(&output.stderr),
                ));
            }
        }
        Ok(parse_remote_urls(&String::from_utf8_lossy(&output.stdout)))
    }

    fn add_remote(&self, name: &str, url: &str) -> Result<(), RepoError> {
        self.run_command(&["remote", "add", name, url])?;
        Ok(())
    }

    fn fetch(&self, remote: &str, refspec: &RefSpec, depth: Option<u32>) -> Result<(), RepoError> {
        let refspec_arg = refspec.to_string();
        let depth_arg = depth.map(|d| format!("--depth={d}"));
        let mut args = vec!["fetch", "--no-tags"];
        if let Some(depth_arg) = &depth_arg {
            args.push(depth_arg);
        }
        // git refuses to fetch into the checked-out branch unless told to
        let dst = refspec.dst.strip_prefix("refs/heads/").unwrap_or(&refspec.dst);
        if self.current_branch()?.as_deref() == Some(dst) {
            args.push("--update-head-ok");
        }
        args.extend([remote, refspec_arg.as_str()]);
        self.run_command(&args)?;
        Ok(())
    }

    fn checkout(&self, branch: &str, options: &CheckoutOptions) -> Result<(), RepoError> {
        let exists = self
            .resolve_commit(&format!("refs/heads/{branch}"))?
            .is_some();
        if exists {
            if self.current_branch()?.as_deref() != Some(branch) {
                self.run_command(&["checkout", branch])?;
            }
        } else if options.create_if_missing {
            let start = options.reset_to.as_deref().unwrap_or("HEAD");
            self.run_command(&["checkout", "-b", branch, start])?;
        } else {
            // Let git produce its own "did not match" error
            self.run_command(&["checkout", branch])?;
        }

        // --keep aborts rather than overwrite a file with local changes
        if let Some(sha) = &options.reset_to {
            self.run_command(&["reset", "--keep", sha])?;
        }
        if let Some(upstream) = &options.track {
            self.run_command(&[
                "branch",
                &format!("--set-upstream-to={upstream}"),
                branch,
            ])?;
        }
        Ok(())
    }

    fn get_config(&self, key: &str) -> Result<Option<String>, RepoError> {
        let args = ["config", "--get", key];
        let output = self.output(&args)?;
        match output.status.code() {
            Some(0) => {
                let value = String::from_utf8_lossy(&output.stdout);
                Ok(Some(value.trim_end_matches(['\n', '\r']).to_string()))
            }
            // Key not set
            Some(1) => Ok(None),
            _ => Err(RepoError::failed(
                command_line(&args),
                String::from_utf8_lossy(&output.stderr),
            )),
        }
    }

    fn set_config(&self, key: &str, value: &str) -> Result<(), RepoError> {
        self.run_command(&["config", key, value])?;
        Ok(())
    }

    fn config_entries(&self, pattern: &str) -> Result<Vec<(String, String)>, RepoError> {
        let args = ["config", "--get-regexp", pattern];
        let output = self.output(&args)?;
        match output.status.code() {
            Some(0) => {}
            Some(1) => return Ok(Vec::new()),
            _ => {
                return Err(RepoError::failed(
                    command_line(&args),
                    String::from_utf8_lossy(&output.stderr),
                ));
            }
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once(' ').unwrap_or((line, ""));
                (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
            })
            .collect())
    }

    fn has_uncommitted_changes(&self) -> Result<bool, RepoError> {
        let stdout = self.run_command(&["status", "--porcelain", "--untracked-files=no"])?;
        Ok(!stdout.trim().is_empty())
    }

    fn resolve_commit(&self, rev: &str) -> Result<Option<String>, RepoError> {
        let args = ["rev-parse", "--verify", "--quiet", &format!("{rev}^{{commit}}")];
        let output = self.output(&args)?;
        if !output.status.success() {
            return Ok(None);
        }
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!sha.is_empty()).then_some(sha))
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, RepoError> {
        let args = ["merge-base", "--is-ancestor", ancestor, descendant];
        let output = self.output(&args)?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(RepoError::failed(
                command_line(&args),
                String::from_utf8_lossy(&output.stderr),
            )),
        }
    }

    fn current_branch(&self) -> Result<Option<String>, RepoError> {
        let stdout = self.run_command(&["branch", "--show-current"])?;
        let branch = stdout.trim();
        Ok((!branch.is_empty()).then(|| branch.to_string()))
    }
}

/// Parse `git config --get-regexp 'remote\..+\.url'` output.
///
/// Remote names may contain dots, so the name is everything between the
/// `remote.` prefix and the last `.url`.
fn parse_remote_urls(output: &str) -> Vec<Remote> {
    output
        .lines()
        .filter_map(|line| {
            let (key, url) = line.split_once(' ')?;
            let name = key.strip_prefix("remote.")?.strip_suffix(".url")?;
            Some(Remote::new(name, url.trim()))
        })
        .collect()
}
