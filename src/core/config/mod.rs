//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! trailmark has two configuration scopes:
//! - **Global**: User-level settings (ledger host, org, retry policy)
//! - **Repo**: Repository-level overrides (org, default flow, redaction)
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. Environment variables and CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. An explicit path (`--config-file`)
//! 2. `$TRAILMARK_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/trailmark/config.toml`
//! 4. `~/.trailmark/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use trailmark::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/repo/.git")), None).unwrap();
//! let config = result.config;
//!
//! println!("Host: {}", config.host());
//! println!("Retries: {}", config.max_api_retries());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::redact::RedactionPolicy;

/// Ledger host used when nothing else is configured.
pub const DEFAULT_HOST: &str = "https://app.kosli.com";

/// Upper bound for `max_api_retries`, from any source.
pub const MAX_API_RETRIES: u32 = 100;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all file sources.
///
/// Accessors apply precedence automatically: repo config overrides global
/// config, which overrides the built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if in a repo)
    pub repo: Option<RepoConfig>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the repo config file (if loaded)
    repo_path: Option<PathBuf>,
}

/// Keys understood by `config get`.
pub const KEYS: &[&str] = &[
    "host",
    "org",
    "flow",
    "max_api_retries",
    "backoff_ms",
    "timeout_secs",
    "max_commits",
    "redact_commit_info",
];

impl Config {
    /// Load configuration from default locations.
    ///
    /// `git_dir` is the repository's `.git` directory (or the bare
    /// repository itself); when given, repo config is loaded from it.
    /// `explicit` replaces the global search path.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed, or if
    /// an explicitly named file does not exist. Missing default files are
    /// not an error.
    pub fn load(git_dir: Option<&Path>, explicit: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = match explicit {
            Some(path) => (Self::read_config::<GlobalConfig>(path)?, Some(path.to_path_buf())),
            None => Self::load_global(&mut warnings)?,
        };

        let (repo, repo_path) = match git_dir {
            Some(dir) => Self::load_repo(dir)?,
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                repo,
                global_path,
                repo_path,
            },
            warnings,
        })
    }

    /// Load global configuration from standard locations.
    fn load_global(
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        // 1. Check $TRAILMARK_CONFIG
        if let Ok(path) = std::env::var("TRAILMARK_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
            warnings.push(ConfigWarning {
                message: "TRAILMARK_CONFIG points to a missing file; falling back".to_string(),
                path,
            });
        }

        // 2. Check $XDG_CONFIG_HOME/trailmark/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("trailmark/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 3. Check ~/.trailmark/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".trailmark/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    /// Load repository configuration from the git directory.
    fn load_repo(git_dir: &Path) -> Result<(Option<RepoConfig>, Option<PathBuf>), ConfigError> {
        let path = Self::repo_config_path(git_dir);
        if !path.exists() {
            return Ok((None, None));
        }
        let config = Self::read_config(&path)?;
        Ok((Some(config), Some(path)))
    }

    /// Read and parse a config file.
    fn read_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for repo config.
    pub fn repo_config_path(git_dir: &Path) -> PathBuf {
        git_dir.join("trailmark/config.toml")
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Ledger base URL. Defaults to [`DEFAULT_HOST`].
    pub fn host(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.host.as_deref())
            .or(self.global.host.as_deref())
            .unwrap_or(DEFAULT_HOST)
    }

    /// Organization, if configured.
    pub fn org(&self) -> Option<&str> {
        self.repo
            .as_ref()
            .and_then(|r| r.org.as_deref())
            .or(self.global.org.as_deref())
    }

    /// Default flow, if configured for this repository.
    pub fn flow(&self) -> Option<&str> {
        self.repo.as_ref().and_then(|r| r.flow.as_deref())
    }

    /// Retries after the first attempt. Defaults to 3.
    pub fn max_api_retries(&self) -> u32 {
        self.global.max_api_retries.unwrap_or(3)
    }

    /// Pause between attempts. Defaults to one second.
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.global.backoff_ms.unwrap_or(1000))
    }

    /// Per-attempt timeout. Defaults to 30 seconds.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.global.timeout_secs.unwrap_or(30))
    }

    /// Maximum commits per range. Defaults to 1000.
    pub fn max_commits(&self) -> usize {
        self.repo
            .as_ref()
            .and_then(|r| r.max_commits)
            .or(self.global.max_commits)
            .unwrap_or(1000)
    }

    /// Redaction configured in files; global and repo policies are combined.
    pub fn redaction(&self) -> Result<RedactionPolicy, ConfigError> {
        let parse = |names: Option<&Vec<String>>| {
            RedactionPolicy::parse(names.into_iter().flatten())
                .map_err(|e| ConfigError::InvalidValue(format!("redact_commit_info: {}", e)))
        };
        let global = parse(self.global.redact_commit_info.as_ref())?;
        let repo = parse(self.repo.as_ref().and_then(|r| r.redact_commit_info.as_ref()))?;
        Ok(global.union(&repo))
    }

    /// Look up a key by name, rendered for display.
    ///
    /// Returns `None` for unknown keys and for unset keys without a default.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "host" => Some(self.host().to_string()),
            "org" => self.org().map(str::to_string),
            "flow" => self.flow().map(str::to_string),
            "max_api_retries" => Some(self.max_api_retries().to_string()),
            "backoff_ms" => Some(self.backoff().as_millis().to_string()),
            "timeout_secs" => Some(self.timeout().as_secs().to_string()),
            "max_commits" => Some(self.max_commits().to_string()),
            "redact_commit_info" => self.redaction().ok().map(|policy| {
                policy
                    .fields()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            }),
            _ => None,
        }
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}
