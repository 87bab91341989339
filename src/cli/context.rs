//! cli::context
//!
//! Per-invocation state shared by command handlers.
//!
//! # Precedence
//!
//! Built-in defaults < global config file < repo config file < flags and
//! `TRAILMARK_*` variables. clap folds the environment into the flags, so
//! only two layers meet here.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};

use super::args::Cli;
use crate::core::config::Config;
use crate::core::redact::RedactionPolicy;
use crate::core::types::ResourceName;
use crate::git::Git;
use crate::ledger::{
    Auth, CancelSignal, DeliveryClient, HttpTransport, LedgerApi, RetryPolicy,
};
use crate::ui::output::{self, Verbosity};

/// Global flags, detached from the parsed command.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    pub host: Option<String>,
    pub org: Option<String>,
    pub api_token: Option<String>,
    pub api_user: Option<String>,
    pub dry_run: bool,
    pub max_api_retries: Option<u32>,
    pub config_file: Option<PathBuf>,
    pub debug: bool,
    pub quiet: bool,
}

impl Globals {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            host: cli.host.clone(),
            org: cli.org.clone(),
            api_token: cli.api_token.clone(),
            api_user: cli.api_user.clone(),
            dry_run: cli.dry_run,
            max_api_retries: cli.max_api_retries,
            config_file: cli.config_file.clone(),
            debug: cli.debug,
            quiet: cli.quiet,
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }
}

/// Configuration merged with flags for one command.
#[derive(Debug)]
pub struct Context {
    pub globals: Globals,
    pub config: Config,
    pub verbosity: Verbosity,
}

impl Context {
    /// Load config (repo layer from `git_dir` when given) and apply flags.
    ///
    /// Config warnings are printed here.
    pub fn load(globals: Globals, git_dir: Option<&Path>) -> Result<Self> {
        let loaded = Config::load(git_dir, globals.config_file.as_deref())
            .context("failed to load configuration")?;
        let verbosity = globals.verbosity();
        for warning in &loaded.warnings {
            output::warn(
                format!("{} ({})", warning.message, warning.path.display()),
                verbosity,
            );
        }
        Ok(Self {
            globals,
            config: loaded.config,
            verbosity,
        })
    }

    pub fn dry_run(&self) -> bool {
        self.globals.dry_run
    }

    pub fn host(&self) -> &str {
        self.globals.host.as_deref().unwrap_or(self.config.host())
    }

    pub fn org(&self) -> Result<ResourceName> {
        let org = self
            .globals
            .org
            .as_deref()
            .or(self.config.org())
            .context("--org is required (or set TRAILMARK_ORG)")?;
        ResourceName::new(org).context("invalid --org")
    }

    /// `--flow`, falling back to the repo config.
    pub fn flow(&self, flag: Option<&str>) -> Result<ResourceName> {
        let flow = flag
            .or(self.config.flow())
            .context("--flow is required (or set TRAILMARK_FLOW)")?;
        ResourceName::new(flow).context("invalid --flow")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self
                .globals
                .max_api_retries
                .unwrap_or(self.config.max_api_retries()),
            backoff: self.config.backoff(),
            timeout: self.config.timeout(),
        }
    }

    /// Credentials from flags. Only a dry run may go without a token.
    pub fn auth(&self) -> Result<Auth> {
        match (&self.globals.api_user, &self.globals.api_token) {
            (Some(user), Some(token)) => Ok(Auth::basic(user.clone(), token.clone())),
            (None, Some(token)) => Ok(Auth::bearer(token.clone())),
            (_, None) if self.dry_run() => Ok(Auth::None),
            (_, None) => bail!("--api-token is required (or set TRAILMARK_API_TOKEN)"),
        }
    }

    /// Redaction from `--redact-commit-info` combined with the config files.
    pub fn redaction(&self, flag: &[String]) -> Result<RedactionPolicy> {
        let from_flag = RedactionPolicy::parse(flag.iter().filter(|s| !s.trim().is_empty()))?;
        let from_config = self.config.redaction()?;
        Ok(from_flag.union(&from_config))
    }

    /// Build the ledger client, cancelled by `cancel`.
    pub fn ledger(&self, cancel: CancelSignal) -> Result<LedgerApi<HttpTransport>> {
        let policy = self.retry_policy();
        let transport = HttpTransport::new(policy.timeout)?;
        let client = DeliveryClient::new(transport, self.auth()?, policy)
            .with_dry_run(self.dry_run())
            .with_cancel(cancel);
        Ok(LedgerApi::new(self.host(), self.org()?, client)?)
    }
}

/// Open the repository around `repo_root`.
pub fn open_repo(repo_root: &Path) -> Result<Git> {
    Git::open(repo_root)
        .with_context(|| format!("'{}' is not inside a git repository", repo_root.display()))
}

/// A tokio runtime for one command.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(globals: Globals) -> Context {
        Context {
            globals,
            config: Config::default(),
            verbosity: Verbosity::Normal,
        }
    }

    #[test]
    fn flags_override_config_defaults() {
        let ctx = context(Globals {
            host: Some("http://localhost:8080".into()),
            max_api_retries: Some(0),
            ..Globals::default()
        });
        assert_eq!(ctx.host(), "http://localhost:8080");
        assert_eq!(ctx.retry_policy().max_retries, 0);

        let ctx = context(Globals::default());
        assert_eq!(ctx.host(), crate::core::config::DEFAULT_HOST);
        assert_eq!(ctx.retry_policy(), RetryPolicy::default());
    }

    mod auth {
        use super::*;

        #[test]
        fn user_switches_to_basic() {
            let ctx = context(Globals {
                api_user: Some("ci".into()),
                api_token: Some("secret".into()),
                ..Globals::default()
            });
            assert!(matches!(ctx.auth().unwrap(), Auth::Basic { .. }));
        }

        #[test]
        fn token_alone_is_bearer() {
            let ctx = context(Globals {
                api_token: Some("secret".into()),
                ..Globals::default()
            });
            assert!(matches!(ctx.auth().unwrap(), Auth::Bearer(_)));
        }

        #[test]
        fn token_required_outside_dry_run() {
            assert!(context(Globals::default()).auth().is_err());
            let ctx = context(Globals {
                dry_run: true,
                ..Globals::default()
            });
            assert!(matches!(ctx.auth().unwrap(), Auth::None));
        }
    }

    #[test]
    fn missing_org_and_flow_are_errors() {
        let ctx = context(Globals::default());
        assert!(ctx.org().is_err());
        assert!(ctx.flow(None).is_err());
        assert_eq!(ctx.flow(Some("web")).unwrap().as_str(), "web");
    }

    #[test]
    fn redaction_flag_is_validated() {
        let ctx = context(Globals::default());
        assert!(ctx.redaction(&["author".into()]).is_ok());
        assert!(ctx.redaction(&["sha".into()]).is_err());
        assert!(ctx.redaction(&[]).unwrap().is_empty());
    }
}
