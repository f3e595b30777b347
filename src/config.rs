//! User configuration.
//!
//! Read from `config.toml` in the platform config directory
//! (`~/.config/pr-checkout/config.toml` on Linux and macOS), with `PRCO_*`
//! environment variables layered on top:
//!
//! ```toml
//! provider = "github"   # tag used in branch.<b>.<provider>-pr-owner-number
//! fetch-depth = 50      # unset: full history
//! mark-remotes = true   # tag remotes added for PRs
//! ```
//!
//! `PRCO_FETCH_DEPTH=50` overrides `fetch-depth`, and so on.

use std::path::{Path, PathBuf};

use config::{Case, ConfigError, Environment, File, FileFormat, Map};
use etcetera::base_strategy::{BaseStrategy, choose_base_strategy};
use serde::{Deserialize, Serialize};

use crate::git::{CheckoutSettings, DEFAULT_PROVIDER, NamingScheme};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "PRCO_CONFIG_PATH";

const ENV_PREFIX: &str = "PRCO";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UserConfig {
    pub provider: String,
    pub fetch_depth: Option<u32>,
    pub mark_remotes: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            fetch_depth: None,
            mark_remotes: true,
        }
    }
}

impl UserConfig {
    /// Load from `path` (a missing file is fine) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load), reading `PRCO_*` variables from `env`
    /// instead of the process environment when given.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            log::debug!("Loading config from {}", path.display());
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .convert_case(Case::Kebab)
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;
        let config: UserConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.naming_scheme()?;
        if self.fetch_depth == Some(0) {
            return Err(ConfigError::Message(
                "fetch-depth must be at least 1 (leave it unset for full history)".into(),
            ));
        }
        Ok(())
    }

    pub fn naming_scheme(&self) -> Result<NamingScheme, ConfigError> {
        NamingScheme::new(&self.provider)
            .map_err(|e| ConfigError::Message(format!("Invalid provider: {e}")))
    }

    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            fetch_depth: self.fetch_depth,
            mark_remotes: self.mark_remotes,
        }
    }
}

/// Get the user config file path.
///
/// Priority:
/// 1. `--config` flag
/// 2. `PRCO_CONFIG_PATH` environment variable
/// 3. Platform config directory (XDG on Linux and macOS, `%APPDATA%` on Windows)
pub fn config_path(cli_override: Option<PathBuf>) -> Option<PathBuf> {
    resolve_config_path(cli_override, std::env::var(CONFIG_PATH_ENV).ok())
}

fn resolve_config_path(cli_override: Option<PathBuf>, env_path: Option<String>) -> Option<PathBuf> {
    if let Some(path) = cli_override {
        return Some(path);
    }
    if let Some(path) = env_path.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let strategy = choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("pr-checkout").join("config.toml"))
}
