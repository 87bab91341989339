//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands, and each falls back to a
//! `TRAILMARK_*` environment variable:
//! - `--host`, `--org`: Where events are reported
//! - `--api-token` / `--api-user`: Credentials (basic auth when a user is given)
//! - `--dry-run`: Print requests instead of sending them
//! - `--max-api-retries`: Retries after the first attempt
//! - `--config-file`: Global config file to load
//! - `--debug` / `--quiet` / `-q`: Output level

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::config::MAX_API_RETRIES;

/// Trailmark - report CI/CD compliance evidence to a ledger
#[derive(Parser, Debug)]
#[command(name = "trailmark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Ledger host
    #[arg(long, global = true, env = "TRAILMARK_HOST")]
    pub host: Option<String>,

    /// Organization events are reported to
    #[arg(long, global = true, env = "TRAILMARK_ORG")]
    pub org: Option<String>,

    /// API token (the password when --api-user is set)
    #[arg(long, global = true, env = "TRAILMARK_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Authenticate with basic auth as this user
    #[arg(long, global = true, env = "TRAILMARK_API_USER")]
    pub api_user: Option<String>,

    /// Print the requests that would be sent and send nothing
    #[arg(long, global = true, env = "TRAILMARK_DRY_RUN")]
    pub dry_run: bool,

    /// Retries after a failed first attempt
    #[arg(
        long,
        global = true,
        env = "TRAILMARK_MAX_API_RETRIES",
        value_parser = clap::value_parser!(u32).range(..=MAX_API_RETRIES as i64)
    )]
    pub max_api_retries: Option<u32>,

    /// Global config file to load instead of the default locations
    #[arg(long, global = true, env = "TRAILMARK_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, env = "TRAILMARK_DEBUG")]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report an approval or evidence
    #[command(
        name = "report",
        long_about = "Report an approval or evidence to the ledger.\n\n\
            Approvals cover the commits between the last approved commit and the \
            one being approved. Evidence is attached to a single commit or artifact."
    )]
    Report {
        #[command(subcommand)]
        what: ReportCommand,
    },

    /// Request an approval
    #[command(
        name = "request",
        long_about = "Request an approval for an artifact.\n\n\
            Records the same commit range as `report approval` but leaves the \
            approval pending until someone grants it in the ledger."
    )]
    Request {
        #[command(subcommand)]
        what: RequestCommand,
    },

    /// Begin a trail
    #[command(name = "begin")]
    Begin {
        #[command(subcommand)]
        what: BeginCommand,
    },

    /// Show configuration
    #[command(
        name = "config",
        long_about = "Show configuration values.\n\n\
            Values come from the global config file, then the repository's \
            .git/trailmark/config.toml. Flags and TRAILMARK_* variables override both.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Show every known key
    trailmark config list

    # Get a specific value
    trailmark config get max_commits"
    )]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    trailmark completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    trailmark completion zsh >> ~/.zshrc

    # Fish
    trailmark completion fish > ~/.config/fish/completions/trailmark.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// `report` subcommands
#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Report an approval for an artifact
    #[command(
        name = "approval",
        long_about = "Report an approval of an artifact to the ledger.\n\n\
            The approval carries every commit after the oldest commit up to and \
            including the newest. Without --oldest-commit, the oldest commit is \
            the last one reported for --environment.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Approve a file artifact for production since the last approval
    trailmark report approval app.tar.gz --artifact-type file \\
        --flow backend --environment production

    # Approve a known fingerprint over an explicit range
    trailmark report approval --fingerprint 2cf24d...9824 \\
        --flow backend --oldest-commit v1.2.0 --newest-commit HEAD

    # See the payload without sending it
    trailmark --dry-run report approval app.tar.gz --artifact-type file \\
        --flow backend --oldest-commit HEAD~3"
    )]
    Approval(ApprovalArgs),

    /// Report evidence
    #[command(name = "evidence")]
    Evidence {
        #[command(subcommand)]
        what: EvidenceCommand,
    },
}

/// `request` subcommands
#[derive(Subcommand, Debug)]
pub enum RequestCommand {
    /// Request an approval for an artifact
    #[command(
        name = "approval",
        after_help = "\
WORKFLOW EXAMPLES:
    # Ask for approval to deploy to production
    trailmark request approval app.tar.gz --artifact-type file \\
        --flow backend --environment production"
    )]
    Approval(ApprovalArgs),
}

/// `begin` subcommands
#[derive(Subcommand, Debug)]
pub enum BeginCommand {
    /// Begin or update a trail
    #[command(
        name = "trail",
        long_about = "Begin a trail in a flow, or update it if it already exists.\n\n\
            The trail is bound to --commit (HEAD by default) when the command runs \
            inside a git repository.",
        after_help = "\
WORKFLOW EXAMPLES:
    # One trail per pull request
    trailmark begin trail pr-42 --flow backend --origin-url $PR_URL

    # Pin the attestations the trail expects
    trailmark begin trail pr-42 --flow backend --template-file flow.yml"
    )]
    Trail(TrailArgs),
}

/// `report evidence` subcommands
#[derive(Subcommand, Debug)]
pub enum EvidenceCommand {
    /// Report evidence for a commit
    #[command(
        name = "commit",
        after_help = "\
WORKFLOW EXAMPLES:
    # Record a passing test run against HEAD in two flows
    trailmark report evidence commit --name unit-tests \\
        --flows backend,frontend --build-url $BUILD_URL"
    )]
    Commit(CommitEvidenceArgs),

    /// Report evidence for an artifact
    #[command(
        name = "artifact",
        after_help = "\
WORKFLOW EXAMPLES:
    # Record a security scan of a built file
    trailmark report evidence artifact app.tar.gz --artifact-type file \\
        --flow backend --name snyk --build-url $BUILD_URL --compliant=false"
    )]
    Artifact(ArtifactEvidenceArgs),
}

/// How the artifact is identified.
#[derive(Args, Debug, Clone, Default)]
pub struct ArtifactArgs {
    /// Artifact name or path, fingerprinted according to --artifact-type
    #[arg(value_name = "ARTIFACT")]
    pub artifact: Option<String>,

    /// SHA-256 fingerprint of the artifact
    #[arg(long, short = 'F')]
    pub fingerprint: Option<String>,

    /// How to fingerprint ARTIFACT (file, dir, docker, oci)
    #[arg(long, short = 't')]
    pub artifact_type: Option<String>,
}

/// User data, redaction and external references shared by every report.
#[derive(Args, Debug, Clone, Default)]
pub struct AnnotationArgs {
    /// JSON file with extra data to attach
    #[arg(long, short = 'u')]
    pub user_data: Option<PathBuf>,

    /// External link as NAME=URL (repeatable)
    #[arg(long = "external-url", value_name = "NAME=URL", value_parser = parse_key_value)]
    pub external_urls: Vec<(String, String)>,

    /// Fingerprint for an external link as NAME=SHA256 (repeatable)
    #[arg(
        long = "external-fingerprint",
        value_name = "NAME=SHA256",
        value_parser = parse_key_value
    )]
    pub external_fingerprints: Vec<(String, String)>,
}

/// Where commit information comes from and what of it is withheld.
#[derive(Args, Debug, Clone, Default)]
pub struct RepoArgs {
    /// Directory inside the git repository
    #[arg(long, default_value = ".")]
    pub repo_root: PathBuf,

    /// Commit fields to withhold (author, committer, message, changed_files, ...)
    #[arg(long, value_delimiter = ',')]
    pub redact_commit_info: Vec<String>,
}

/// Arguments for `report approval` and `request approval`.
#[derive(Args, Debug, Clone)]
pub struct ApprovalArgs {
    #[command(flatten)]
    pub artifact: ArtifactArgs,

    /// Flow the artifact belongs to
    #[arg(long, short = 'f', env = "TRAILMARK_FLOW")]
    pub flow: Option<String>,

    /// Environment the approval is for
    #[arg(long, short = 'e')]
    pub environment: Option<String>,

    /// Oldest commit, excluded from the range
    #[arg(long)]
    pub oldest_commit: Option<String>,

    /// Newest commit, included in the range
    #[arg(long, default_value = "HEAD")]
    pub newest_commit: String,

    /// What is being approved
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Who approved
    #[arg(long)]
    pub approver: Option<String>,

    #[command(flatten)]
    pub repo: RepoArgs,

    #[command(flatten)]
    pub annotations: AnnotationArgs,
}

/// Arguments for `begin trail`.
#[derive(Args, Debug, Clone)]
pub struct TrailArgs {
    /// Trail name
    pub name: String,

    /// Flow the trail belongs to
    #[arg(long, short = 'f', env = "TRAILMARK_FLOW")]
    pub flow: Option<String>,

    /// Trail description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Commit the trail is bound to (HEAD by default)
    #[arg(long, short = 'g')]
    pub commit: Option<String>,

    /// Link back to where the trail started, e.g. a pull request
    #[arg(long)]
    pub origin_url: Option<String>,

    /// Flow template (YAML) uploaded with the trail
    #[arg(long, value_name = "FILE")]
    pub template_file: Option<PathBuf>,

    #[command(flatten)]
    pub repo: RepoArgs,

    #[command(flatten)]
    pub annotations: AnnotationArgs,
}

/// Arguments for `report evidence commit`.
#[derive(Args, Debug, Clone)]
pub struct CommitEvidenceArgs {
    /// Commit the evidence is for (HEAD by default)
    #[arg(long, short = 'g')]
    pub commit: Option<String>,

    /// Evidence name
    #[arg(long, short = 'n')]
    pub name: String,

    /// Flows the evidence applies to
    #[arg(long, value_delimiter = ',', required = true)]
    pub flows: Vec<String>,

    /// Link to the build that produced the evidence
    #[arg(long, short = 'b', env = "TRAILMARK_BUILD_URL")]
    pub build_url: String,

    /// Whether the evidence is compliant
    #[arg(long, short = 'C', default_value_t = true, action = ArgAction::Set)]
    pub compliant: bool,

    /// Evidence description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[command(flatten)]
    pub repo: RepoArgs,

    #[command(flatten)]
    pub annotations: AnnotationArgs,
}

/// Arguments for `report evidence artifact`.
#[derive(Args, Debug, Clone)]
pub struct ArtifactEvidenceArgs {
    #[command(flatten)]
    pub artifact: ArtifactArgs,

    /// Flow the artifact belongs to
    #[arg(long, short = 'f', env = "TRAILMARK_FLOW")]
    pub flow: Option<String>,

    /// Evidence name
    #[arg(long, short = 'n')]
    pub name: String,

    /// Link to the build that produced the evidence
    #[arg(long, short = 'b', env = "TRAILMARK_BUILD_URL")]
    pub build_url: String,

    /// Whether the evidence is compliant
    #[arg(long, short = 'C', default_value_t = true, action = ArgAction::Set)]
    pub compliant: bool,

    /// Evidence description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[command(flatten)]
    pub annotations: AnnotationArgs,
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// List all configuration values
    List,
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Split `NAME=VALUE` at the first `=`.
///
/// An empty name is let through so the payload builder reports it.
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))
}
