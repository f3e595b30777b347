use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use pr_checkout::config::{UserConfig, config_path};
use pr_checkout::git::{
    GitRepository, PullRequestRecord, RawPullRequest, RepositoryOps, checkout_pull_request,
    is_unresolved_head, pr_branches, pr_for_branch,
};
use pr_checkout::hosting::{GhResolver, fetch_pull_request};
use pr_checkout::output::{checkout_summary, error_message, pr_branch_table, provenance_line};
use pr_checkout::styling::{eprintln, println};

#[derive(Parser)]
#[command(name = "prco", version, about = "Check out pull requests from forks")]
struct Cli {
    /// Run as if started in <PATH>
    #[arg(short = 'C', global = true, value_name = "PATH")]
    directory: Option<PathBuf>,

    /// User config file (default: platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log every git and gh command
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check out a pull request into pr/<author>/<number>
    Checkout {
        /// PR number
        number: u64,

        /// Read the PR object from a JSON file instead of `gh api`
        #[arg(long, value_name = "FILE")]
        payload: Option<PathBuf>,
    },
    /// Show which PR a branch was checked out from
    Show {
        /// Branch to look up (default: current branch)
        branch: Option<String>,
    },
    /// List all branches checked out from PRs
    List,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", error_message(&err));
            if is_unresolved_head(&err) {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let dir = cli.directory.unwrap_or_else(|| PathBuf::from("."));
    let root = GitRepository::at(&dir)
        .worktree_root()
        .with_context(|| format!("{} is not inside a git repository", dir.display()))?;
    let repo = GitRepository::at(&root);

    let config_file = config_path(cli.config);
    let config = UserConfig::load(config_file.as_deref()).with_context(|| match &config_file {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config".to_string(),
    })?;

    match cli.command {
        Command::Checkout { number, payload } => {
            checkout(&repo, &root, &config, number, payload.as_deref())
        }
        Command::Show { branch } => {
            let branch = match branch {
                Some(branch) => branch,
                None => repo
                    .current_branch()?
                    .context("HEAD is detached; name a branch to show")?,
            };
            let provenance = pr_for_branch(&repo, &branch, &config.provider)?;
            println!("{}", provenance_line(&branch, provenance.as_ref()));
            Ok(())
        }
        Command::List => {
            let branches = pr_branches(&repo, &config.provider)?;
            println!("{}", pr_branch_table(&branches));
            Ok(())
        }
    }
}

fn checkout(
    repo: &GitRepository,
    root: &Path,
    config: &UserConfig,
    number: u64,
    payload: Option<&Path>,
) -> anyhow::Result<()> {
    let raw = match payload {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let raw: RawPullRequest = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse PR payload {}", path.display()))?;
            if raw.number != number {
                bail!(
                    "{} describes PR #{}, not #{number}",
                    path.display(),
                    raw.number
                );
            }
            raw
        }
        None => fetch_pull_request(number, root)?,
    };

    let resolver = GhResolver::new(root);
    let mut pr = PullRequestRecord::from_raw_payload(&raw, &resolver)?;
    let scheme = config.naming_scheme()?;
    let report = checkout_pull_request(repo, &mut pr, &scheme, config.checkout_settings())?;

    println!("{}", checkout_summary(&pr, &report));
    Ok(())
}
