//! Throwaway git repositories for integration tests.
//!
//! Every git process gets an isolated environment (no global or system
//! config, fixed identity and dates) through per-command env vars, so tests
//! can run in parallel without touching the process environment.

use std::path::{Path, PathBuf};
use std::process::Command;

use pr_checkout::git::{
    ApiError, GitRepository, RawPullRequest, RawRef, RawRepository, RawUser, RemoteEndpoint,
    ResolvedHeadRef,
};
use tempfile::TempDir;

const GIT_ENV: [(&str, &str); 10] = [
    ("GIT_CONFIG_GLOBAL", "/dev/null"),
    ("GIT_CONFIG_SYSTEM", "/dev/null"),
    ("GIT_AUTHOR_NAME", "Test User"),
    ("GIT_AUTHOR_EMAIL", "test@example.com"),
    ("GIT_COMMITTER_NAME", "Test User"),
    ("GIT_COMMITTER_EMAIL", "test@example.com"),
    ("GIT_AUTHOR_DATE", "2025-01-01T00:00:00Z"),
    ("GIT_COMMITTER_DATE", "2025-01-01T00:00:00Z"),
    ("LC_ALL", "C"),
    ("GIT_TERMINAL_PROMPT", "0"),
];

/// Apply the isolated git environment to a command.
pub fn isolate(cmd: &mut Command) -> &mut Command {
    for (key, val) in GIT_ENV {
        cmd.env(key, val);
    }
    cmd
}

/// Run git in `dir`, panicking with its output on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = isolate(Command::new("git").args(args).current_dir(dir))
        .output()
        .expect("Failed to execute git");
    if !output.status.success() {
        panic!(
            "git {} failed:\nstdout: {}\nstderr: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn init_repo(path: &Path) {
    std::fs::create_dir_all(path).expect("Failed to create repo directory");
    git(path, &["init", "-b", "main"]);
}

/// A local repository with an `origin`, plus fork repositories beside it.
pub struct TestRepo {
    temp_dir: TempDir,
    root: PathBuf,
    origin: PathBuf,
}

impl TestRepo {
    /// `main` cloned from an `aaa/bbb` upstream, one commit on `main`.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        // Canonicalize to resolve symlinks (macOS /var is a symlink to /private/var)
        let base = temp_dir
            .path()
            .canonicalize()
            .expect("Failed to canonicalize temp path");

        let origin = base.join("hosted").join("aaa").join("bbb");
        init_repo(&origin);
        commit(&origin, "README.md", "upstream\n", "Initial commit");

        let root = base.join("main");
        init_repo(&root);
        git(&root, &["remote", "add", "origin", &file_url(&origin)]);
        git(&root, &["fetch", "origin"]);
        git(&root, &["reset", "--hard", "origin/main"]);

        Self {
            temp_dir,
            root,
            origin,
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub fn origin_path(&self) -> &Path {
        &self.origin
    }

    /// [`GitRepository`] for the local clone, with the isolated environment.
    pub fn repository(&self) -> GitRepository {
        GIT_ENV
            .iter()
            .fold(GitRepository::at(&self.root), |repo, (key, val)| {
                repo.with_env(*key, *val)
            })
    }

    /// Create `owner/<repo>` next to the upstream, with `branch` one commit
    /// ahead of upstream `main`. Returns the fork's path.
    pub fn fork(&self, owner: &str, repo: &str, branch: &str) -> PathBuf {
        let path = self
            .temp_dir
            .path()
            .canonicalize()
            .unwrap()
            .join("hosted")
            .join(owner)
            .join(repo);
        init_repo(&path);
        git(&path, &["pull", &file_url(&self.origin), "main"]);
        git(&path, &["checkout", "-b", branch]);
        commit(&path, "feature.txt", "first\n", "Add feature");
        path
    }

    pub fn git(&self, args: &[&str]) -> String {
        git(&self.root, args)
    }

    pub fn head_sha(&self) -> String {
        self.git(&["rev-parse", "HEAD"])
    }

    pub fn current_branch(&self) -> String {
        self.git(&["branch", "--show-current"])
    }

    pub fn config(&self, key: &str) -> Option<String> {
        let output = isolate(
            Command::new("git")
                .args(["config", "--get", key])
                .current_dir(&self.root),
        )
        .output()
        .expect("Failed to execute git config");
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub fn remotes(&self) -> Vec<String> {
        self.git(&["remote", "-v"])
            .lines()
            .filter(|line| line.ends_with("(fetch)"))
            .map(|line| line.trim_end_matches(" (fetch)").to_string())
            .collect()
    }
}

/// Commit a file in `dir` and return the new HEAD sha.
pub fn commit(dir: &Path, file: &str, contents: &str, message: &str) -> String {
    std::fs::write(dir.join(file), contents).expect("Failed to write file");
    git(dir, &["add", file]);
    git(dir, &["commit", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

pub fn sha_of(dir: &Path, rev: &str) -> String {
    git(dir, &["rev-parse", rev])
}

/// A PR object as the hosting API would return it.
pub fn payload(
    number: u64,
    author: &str,
    head: (&str, &str, &str, &Path),
    base: (&str, &str, &str, &Path),
) -> RawPullRequest {
    let side = |(owner, repo, ref_name, path): (&str, &str, &str, &Path)| RawRef {
        ref_name: ref_name.to_string(),
        sha: Some(sha_of(path, ref_name)),
        user: Some(RawUser {
            login: owner.to_string(),
        }),
        repo: Some(RawRepository {
            name: repo.to_string(),
            owner: RawUser {
                login: owner.to_string(),
            },
            clone_url: Some(file_url(path)),
        }),
    };
    RawPullRequest {
        number,
        user: Some(RawUser {
            login: author.to_string(),
        }),
        head: side(head),
        base: side(base),
    }
}

/// Head-ref lookup answered from the fork repository on disk.
pub fn resolve_from_disk(
    path: &Path,
) -> impl Fn(&str, &str, &str) -> Result<ResolvedHeadRef, ApiError> + '_ {
    move |_owner: &str, _repo: &str, ref_name: &str| -> Result<ResolvedHeadRef, ApiError> {
        let output = isolate(
            Command::new("git")
                .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{ref_name}")])
                .current_dir(path),
        )
        .output()
        .expect("Failed to execute git rev-parse");
        let exists = output.status.success();
        Ok(ResolvedHeadRef {
            ref_name: ref_name.to_string(),
            sha: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            exists,
            repo: Some(RemoteEndpoint::parse(&file_url(path)).expect("fork URL parses")),
        })
    }
}
