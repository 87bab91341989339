//! core::range
//!
//! Deciding which commits belong to a reported event.
//!
//! # Boundary Derivation
//!
//! A range is `(oldest, newest]`. Exactly one derivation applies:
//!
//! 1. Both bounds explicit.
//! 2. `newest` explicit, `oldest` inferred from the ledger.
//! 3. Neither explicit: `newest` is HEAD, `oldest` inferred from the ledger.
//!
//! An explicit `oldest` always wins over inference; the ledger is consulted
//! only when no explicit `oldest` was given. Without either an explicit
//! `oldest` or an environment to infer from, resolution fails with
//! [`RangeError::MissingBoundary`].
//!
//! # Example
//!
//! ```ignore
//! use trailmark::core::range::{BoundaryRequest, CommitRangeResolver};
//!
//! let resolver = CommitRangeResolver::new(&git, &ledger, 1000);
//! let range = resolver
//!     .resolve(&BoundaryRequest::explicit("HEAD~3", "HEAD"))
//!     .await?;
//! assert_eq!(range.len(), 3);
//! ```

use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use super::commit::{BoundarySource, CommitRange, CommitSummary, Truncation};
use super::types::Oid;
use crate::git::{GitError, GitQuery};
use crate::ledger::{LedgerError, LedgerLookup, LookupKey};

/// Errors from commit range resolution.
#[derive(Debug, Error)]
pub enum RangeError {
    /// No lower bound could be derived. `environment` is set when inference
    /// was attempted but the ledger had no prior commit.
    #[error("{}", missing_boundary_message(environment.as_deref()))]
    MissingBoundary { environment: Option<String> },

    #[error("unknown revision: {expr}")]
    UnknownRevision { expr: String },

    #[error("commit {oldest} is not an ancestor of {newest}")]
    DisjointHistory { oldest: Oid, newest: Oid },

    #[error("not a git repository: {path}")]
    NotAGitRepository { path: PathBuf },

    #[error(transparent)]
    Git(GitError),

    #[error("failed to query the ledger: {0}")]
    Ledger(#[from] LedgerError),
}

fn missing_boundary_message(environment: Option<&str>) -> String {
    match environment {
        Some(env) => format!(
            "no previous commit was reported for environment '{env}'; pass --oldest-commit"
        ),
        None => "at least one of --environment, --oldest-commit is required".to_string(),
    }
}

impl From<GitError> for RangeError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::NotARepo { path } => RangeError::NotAGitRepository { path },
            GitError::UnknownRevision { expr } => RangeError::UnknownRevision { expr },
            GitError::ObjectNotFound { oid } | GitError::InvalidOid { oid } => {
                RangeError::UnknownRevision { expr: oid }
            }
            other => RangeError::Git(other),
        }
    }
}

/// The caller's description of a range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundaryRequest {
    /// Explicit exclusive lower bound
    pub oldest: Option<String>,
    /// Explicit inclusive upper bound; HEAD when absent
    pub newest: Option<String>,
    /// Identity used to infer `oldest` from the ledger
    pub inference: Option<LookupKey>,
    /// Collect each commit's changed files
    pub with_changed_files: bool,
}

impl BoundaryRequest {
    /// Both bounds given explicitly.
    pub fn explicit(oldest: impl Into<String>, newest: impl Into<String>) -> Self {
        Self {
            oldest: Some(oldest.into()),
            newest: Some(newest.into()),
            ..Self::default()
        }
    }

    /// `oldest` inferred from the ledger for `key`.
    pub fn inferred(key: LookupKey, newest: Option<String>) -> Self {
        Self {
            newest,
            inference: Some(key),
            ..Self::default()
        }
    }
}

/// Resolves [`BoundaryRequest`]s into [`CommitRange`]s.
pub struct CommitRangeResolver<'a> {
    git: &'a dyn GitQuery,
    ledger: &'a dyn LedgerLookup,
    max_commits: usize,
}

impl<'a> CommitRangeResolver<'a> {
    /// Create a resolver that keeps at most `max_commits` commits per range.
    pub fn new(git: &'a dyn GitQuery, ledger: &'a dyn LedgerLookup, max_commits: usize) -> Self {
        Self {
            git,
            ledger,
            max_commits: max_commits.max(1),
        }
    }

    /// Resolve `request` into an oldest-first range.
    ///
    /// # Errors
    ///
    /// - [`RangeError::MissingBoundary`] without an explicit oldest or an
    ///   environment, or when inference finds nothing
    /// - [`RangeError::UnknownRevision`] for an unresolvable expression
    /// - [`RangeError::DisjointHistory`] when oldest is not an ancestor of newest
    pub async fn resolve(&self, request: &BoundaryRequest) -> Result<CommitRange, RangeError> {
        let newest = match &request.newest {
            Some(expr) => self.git.resolve_revision(expr)?,
            None => self.git.head_oid()?,
        };

        let (oldest, oldest_source) = match (&request.oldest, &request.inference) {
            (Some(expr), _) => (self.git.resolve_revision(expr)?, BoundarySource::Explicit),
            (None, Some(key)) => {
                let commit = self.ledger.last_reported_commit(key).await?.ok_or_else(|| {
                    RangeError::MissingBoundary {
                        environment: Some(key.environment.to_string()),
                    }
                })?;
                (commit, BoundarySource::Ledger)
            }
            (None, None) => return Err(RangeError::MissingBoundary { environment: None }),
        };

        debug!(
            oldest = %oldest.short(7),
            newest = %newest.short(7),
            source = ?oldest_source,
            "resolved range boundaries"
        );

        if oldest == newest {
            return Ok(CommitRange {
                oldest,
                newest,
                commits: Vec::new(),
                oldest_source,
                truncation: None,
            });
        }

        if !self.git.is_ancestor(&oldest, &newest)? {
            return Err(RangeError::DisjointHistory { oldest, newest });
        }

        let mut ids = self.git.ancestors_exclusive(&newest, &oldest)?;
        let truncation = if ids.len() > self.max_commits {
            let total = ids.len();
            ids.drain(..total - self.max_commits);
            debug!(total, kept = self.max_commits, "truncated commit range");
            Some(Truncation {
                total,
                kept: self.max_commits,
            })
        } else {
            None
        };

        let commits = ids
            .iter()
            .map(|id| self.git.commit_summary(id, request.with_changed_files))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CommitRange {
            oldest,
            newest,
            commits,
            oldest_source,
            truncation,
        })
    }

    /// Summarize a single commit, HEAD when `expr` is absent.
    pub fn resolve_commit(
        &self,
        expr: Option<&str>,
        with_changed_files: bool,
    ) -> Result<CommitSummary, RangeError> {
        let oid = match expr {
            Some(expr) => self.git.resolve_revision(expr)?,
            None => self.git.head_oid()?,
        };
        Ok(self.git.commit_summary(&oid, with_changed_files)?)
    }
}
