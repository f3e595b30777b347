//! Check out pull requests from forks and remember which PR each branch tracks.
//!
//! The library side is [`git`]: URL and PR models, the branch naming and
//! config scheme, and the checkout state machine. [`hosting`] talks to the
//! GitHub CLI, [`config`] loads user settings.

pub mod config;
pub mod git;
pub mod hosting;
pub mod output;
pub mod shell_exec;
pub mod styling;
