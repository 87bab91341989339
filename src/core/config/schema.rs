//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `--config-file` if given
//! 2. `$TRAILMARK_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/trailmark/config.toml`
//! 4. `~/.trailmark/config.toml`
//!
//! # Repo Config
//!
//! Located at `<git dir>/trailmark/config.toml`.
//!
//! # Validation
//!
//! Values are validated after parsing (hosts must be http(s) URLs, names
//! must be valid resource names, counts must be positive).

use serde::{Deserialize, Serialize};

use super::{ConfigError, MAX_API_RETRIES};
use crate::core::redact::RedactionPolicy;
use crate::core::types::ResourceName;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// host = "https://app.kosli.com"
/// org = "acme"
/// max_api_retries = 3
/// backoff_ms = 1000
/// timeout_secs = 30
/// max_commits = 1000
/// redact_commit_info = ["author_email"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Ledger base URL
    pub host: Option<String>,

    /// Organization
    pub org: Option<String>,

    /// Retries after the first delivery attempt
    pub max_api_retries: Option<u32>,

    /// Pause between delivery attempts, in milliseconds
    pub backoff_ms: Option<u64>,

    /// Per-attempt timeout, in seconds
    pub timeout_secs: Option<u64>,

    /// Upper bound on commits per reported range
    pub max_commits: Option<usize>,

    /// Commit fields withheld from every report
    pub redact_commit_info: Option<Vec<String>>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_host(self.host.as_deref())?;
        validate_name("org", self.org.as_deref())?;
        validate_retries(self.max_api_retries)?;
        validate_positive("timeout_secs", self.timeout_secs.map(|v| v as usize))?;
        validate_positive("max_commits", self.max_commits)?;
        validate_redaction(self.redact_commit_info.as_deref())?;
        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// org = "acme"
/// flow = "backend"
/// max_commits = 200
/// redact_commit_info = ["message"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Ledger base URL for this repository
    pub host: Option<String>,

    /// Organization for this repository
    pub org: Option<String>,

    /// Default flow for commands run in this repository
    pub flow: Option<String>,

    /// Upper bound on commits per reported range
    pub max_commits: Option<usize>,

    /// Commit fields withheld from reports from this repository
    pub redact_commit_info: Option<Vec<String>>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_host(self.host.as_deref())?;
        validate_name("org", self.org.as_deref())?;
        validate_name("flow", self.flow.as_deref())?;
        validate_positive("max_commits", self.max_commits)?;
        validate_redaction(self.redact_commit_info.as_deref())?;
        Ok(())
    }
}

fn validate_host(host: Option<&str>) -> Result<(), ConfigError> {
    let Some(host) = host else {
        return Ok(());
    };
    let url = reqwest::Url::parse(host)
        .map_err(|e| ConfigError::InvalidValue(format!("invalid host '{}': {}", host, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue(format!(
            "invalid host '{}', must be an http or https URL",
            host
        )));
    }
    Ok(())
}

fn validate_name(key: &str, value: Option<&str>) -> Result<(), ConfigError> {
    if let Some(value) = value {
        ResourceName::new(value)
            .map_err(|e| ConfigError::InvalidValue(format!("invalid {}: {}", key, e)))?;
    }
    Ok(())
}

fn validate_positive(key: &str, value: Option<usize>) -> Result<(), ConfigError> {
    if value == Some(0) {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be greater than zero",
            key
        )));
    }
    Ok(())
}

fn validate_retries(value: Option<u32>) -> Result<(), ConfigError> {
    match value {
        Some(n) if n > MAX_API_RETRIES => Err(ConfigError::InvalidValue(format!(
            "max_api_retries must be at most {MAX_API_RETRIES}"
        ))),
        _ => Ok(()),
    }
}

fn validate_redaction(names: Option<&[String]>) -> Result<(), ConfigError> {
    if let Some(names) = names {
        RedactionPolicy::parse(names)
            .map_err(|e| ConfigError::InvalidValue(format!("redact_commit_info: {}", e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod global_config {
        use super::*;

        #[test]
        fn defaults() {
            let config = GlobalConfig::default();
            assert!(config.host.is_none());
            assert!(config.max_api_retries.is_none());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn valid_host() {
            let config = GlobalConfig {
                host: Some("https://ledger.example.com".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_ok());
        }

        #[test]
        fn invalid_host_scheme() {
            let config = GlobalConfig {
                host: Some("ftp://ledger.example.com".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn zero_timeout_rejected() {
            let config = GlobalConfig {
                timeout_secs: Some(0),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn zero_retries_allowed() {
            let config = GlobalConfig {
                max_api_retries: Some(0),
                ..Default::default()
            };
            assert!(config.validate().is_ok());
        }

        #[test]
        fn excessive_retries_rejected() {
            let config = GlobalConfig {
                max_api_retries: Some(MAX_API_RETRIES + 1),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn parse_toml() {
            let config: GlobalConfig = toml::from_str(
                r#"
                host = "http://localhost:8001"
                org = "acme"
                redact_commit_info = ["author", "message"]
                "#,
            )
            .unwrap();
            assert_eq!(config.org.as_deref(), Some("acme"));
            assert!(config.validate().is_ok());
        }
    }

    mod repo_config {
        use super::*;

        #[test]
        fn invalid_flow_rejected() {
            let config = RepoConfig {
                flow: Some("-bad".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn unknown_redaction_field_rejected() {
            let config = RepoConfig {
                redact_commit_info: Some(vec!["sha1".to_string()]),
                ..Default::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("redact_commit_info"));
        }

        #[test]
        fn unknown_fields_rejected() {
            let result: Result<RepoConfig, _> = toml::from_str("trunk = \"main\"");
            assert!(result.is_err());
        }
    }
}
