//! Reading back which PR a branch or remote was created for.

use regex::Regex;

use super::error::{CheckoutError, MalformedConfig};
use super::naming::{PrProvenance, config_key, parse_config_value, remote_marker_key};
use super::RepositoryOps;

/// A branch carrying a provenance key, and what its value parsed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrBranch {
    pub branch: String,
    pub provenance: Result<PrProvenance, MalformedConfig>,
}

/// The PR `branch` was checked out for, if any.
///
/// `Ok(None)` when the branch has no provenance key; a corrupt value is an error.
pub fn pr_for_branch<R: RepositoryOps + ?Sized>(
    repo: &R,
    branch: &str,
    provider: &str,
) -> Result<Option<PrProvenance>, CheckoutError> {
    let key = config_key(branch, provider);
    let value = repo
        .get_config(&key)
        .map_err(|source| CheckoutError::Inspect {
            what: key.clone(),
            source,
        })?;
    match value {
        Some(value) => Ok(Some(parse_config_value(&value)?)),
        None => Ok(None),
    }
}

/// Every branch with a provenance key for `provider`, sorted by branch name.
///
/// Malformed values are returned alongside valid ones rather than skipped.
pub fn pr_branches<R: RepositoryOps + ?Sized>(
    repo: &R,
    provider: &str,
) -> Result<Vec<PrBranch>, CheckoutError> {
    let suffix = format!(".{provider}-pr-owner-number");
    let pattern = format!(r"^branch\..*{}$", regex::escape(&suffix));
    let entries = repo
        .config_entries(&pattern)
        .map_err(|source| CheckoutError::Inspect {
            what: "branch config".into(),
            source,
        })?;

    let key_re = Regex::new(&format!(r"^branch\.(.+){}$", regex::escape(&suffix)))
        .map_err(|_| CheckoutError::InvalidName {
            name: provider.to_string(),
            reason: "provider can't be used in a config pattern",
        })?;

    let mut branches: Vec<PrBranch> = entries
        .into_iter()
        .filter_map(|(key, value)| {
            let branch = key_re.captures(&key)?.get(1)?.as_str().to_string();
            Some(PrBranch {
                branch,
                provenance: parse_config_value(&value),
            })
        })
        .collect();
    branches.sort_by(|a, b| a.branch.cmp(&b.branch));
    Ok(branches)
}

/// Whether `remote` was added by a PR checkout (carries the marker key).
pub fn is_remote_created_for_pr<R: RepositoryOps + ?Sized>(
    repo: &R,
    remote: &str,
    provider: &str,
) -> Result<bool, CheckoutError> {
    let key = remote_marker_key(remote, provider);
    let value = repo
        .get_config(&key)
        .map_err(|source| CheckoutError::Inspect {
            what: key.clone(),
            source,
        })?;
    Ok(value.is_some_and(|v| v.eq_ignore_ascii_case("true")))
}
