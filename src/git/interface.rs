//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to all repository reads in
//! trailmark. No other module imports `git2`; everything else talks to the
//! [`GitQuery`] trait, which a test can implement over an in-memory history.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: No repository at or above the configured root
//! - [`GitError::UnknownRevision`]: An expression did not resolve to a commit
//! - [`GitError::ObjectNotFound`]: A commit id is not in the object database
//!
//! # Example
//!
//! ```ignore
//! use trailmark::git::{Git, GitQuery};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let oid = git.resolve_revision("HEAD~3")?;
//! let summary = git.commit_summary(&oid, false)?;
//! println!("{} {}", oid.short(7), summary.subject().unwrap_or(""));
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::revision::{AncestryStep, GitRevisionSyntax, RevisionSyntax};
use crate::core::commit::CommitSummary;
use crate::core::types::{Oid, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// A revision expression did not resolve to a commit.
    #[error("unknown revision: {expr}")]
    UnknownRevision {
        /// The expression as given by the caller
        expr: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::ObjectNotFound {
                oid: context.to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }

    fn internal(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        GitError::InvalidOid {
            oid: err.to_string(),
        }
    }
}

/// Read-only repository queries needed to compute commit ranges.
///
/// Implementations must not mutate the repository. The handle may be
/// reused across many resolver calls within one process run.
pub trait GitQuery {
    /// Resolve a revision expression (`HEAD~2`, a branch, a hash) to a commit.
    fn resolve_revision(&self, expr: &str) -> Result<Oid, GitError>;

    /// The commit the working tree's HEAD points at.
    fn head_oid(&self) -> Result<Oid, GitError>;

    /// Reportable facts for one commit.
    fn commit_summary(&self, oid: &Oid, with_changed_files: bool)
        -> Result<CommitSummary, GitError>;

    /// Commits reachable from `newest` but not from `oldest`, oldest-first.
    fn ancestors_exclusive(&self, newest: &Oid, oldest: &Oid) -> Result<Vec<Oid>, GitError>;

    /// Whether `ancestor` is reachable from `descendant` (a commit is its own ancestor).
    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError>;
}

/// The Git interface.
///
/// Wraps a discovered `git2::Repository` and a [`RevisionSyntax`] strategy.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
    /// Parser for revision expressions
    syntax: Box<dyn RevisionSyntax>,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover` to find the repository root,
    /// so `path` can be any directory within the repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    pub fn open(path: &Path) -> Result<Self, GitError> {
        Self::open_with_syntax(path, Box::new(GitRevisionSyntax))
    }

    /// Open a repository with a custom revision expression grammar.
    pub fn open_with_syntax(path: &Path, syntax: Box<dyn RevisionSyntax>) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        Ok(Self { repo, syntax })
    }

    /// Path to the `.git` directory.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Path to the working directory, if the repository is not bare.
    pub fn work_dir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    fn to_git2(oid: &Oid) -> Result<git2::Oid, GitError> {
        git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    /// The git2 id of a commit present in the object database.
    ///
    /// Ledger-supplied ids may name commits a shallow clone never fetched;
    /// those surface as [`GitError::ObjectNotFound`].
    fn commit_id(&self, oid: &Oid) -> Result<git2::Oid, GitError> {
        let id = Self::to_git2(oid)?;
        self.repo
            .find_commit(id)
            .map(|commit| commit.id())
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    fn to_oid(oid: git2::Oid) -> Result<Oid, GitError> {
        Oid::new(oid.to_string()).map_err(Into::into)
    }

    fn find_commit(&self, oid: &Oid) -> Result<git2::Commit<'_>, GitError> {
        self.repo
            .find_commit(Self::to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    /// Paths changed by `commit` relative to its first parent.
    fn changed_files(&self, commit: &git2::Commit<'_>) -> Result<Vec<String>, GitError> {
        let tree = commit.tree().map_err(GitError::internal)?;
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree().map_err(GitError::internal)?),
            Err(_) => None,
        };

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .map_err(GitError::internal)?;

        let mut files = Vec::new();
        for delta in diff.deltas() {
            let path = delta.new_file().path().or_else(|| delta.old_file().path());
            if let Some(path) = path {
                files.push(path.to_string_lossy().into_owned());
            }
        }
        Ok(files)
    }
}

impl GitQuery for Git {
    fn resolve_revision(&self, expr: &str) -> Result<Oid, GitError> {
        let unknown = || GitError::UnknownRevision {
            expr: expr.to_string(),
        };

        let parsed = self.syntax.parse(expr)?;
        let mut commit = self
            .repo
            .revparse_single(&parsed.base)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(|_| unknown())?;

        for step in parsed.steps {
            commit = match step {
                AncestryStep::Parent(0) => commit,
                AncestryStep::Parent(n) => commit.parent(n - 1).map_err(|_| unknown())?,
                AncestryStep::FirstParent(n) => {
                    let mut current = commit;
                    for _ in 0..n {
                        current = current.parent(0).map_err(|_| unknown())?;
                    }
                    current
                }
            };
        }

        Self::to_oid(commit.id())
    }

    fn head_oid(&self) -> Result<Oid, GitError> {
        let head = self.repo.head().map_err(|_| GitError::UnknownRevision {
            expr: "HEAD".to_string(),
        })?;
        let commit = head.peel_to_commit().map_err(|_| GitError::UnknownRevision {
            expr: "HEAD".to_string(),
        })?;
        Self::to_oid(commit.id())
    }

    fn commit_summary(
        &self,
        oid: &Oid,
        with_changed_files: bool,
    ) -> Result<CommitSummary, GitError> {
        let commit = self.find_commit(oid)?;
        let author = commit.author();
        let committer = commit.committer();
        let timestamp = chrono::DateTime::from_timestamp(commit.time().seconds(), 0)
            .unwrap_or_default();

        let mut parents = Vec::new();
        for parent in commit.parent_ids() {
            parents.push(Self::to_oid(parent)?);
        }

        let changed_files = if with_changed_files {
            Some(self.changed_files(&commit)?.into())
        } else {
            None
        };

        Ok(CommitSummary {
            id: oid.clone(),
            author_name: author.name().unwrap_or("").to_string().into(),
            author_email: author.email().unwrap_or("").to_string().into(),
            committer_name: committer.name().unwrap_or("").to_string().into(),
            committer_email: committer.email().unwrap_or("").to_string().into(),
            message: commit.message().unwrap_or("").trim_end().to_string().into(),
            timestamp,
            parents,
            changed_files,
        })
    }

    fn ancestors_exclusive(&self, newest: &Oid, oldest: &Oid) -> Result<Vec<Oid>, GitError> {
        let mut revwalk = self.repo.revwalk().map_err(GitError::internal)?;
        revwalk
            .set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)
            .map_err(GitError::internal)?;
        revwalk
            .push(self.commit_id(newest)?)
            .map_err(|e| GitError::from_git2(e, newest.as_str()))?;
        revwalk
            .hide(self.commit_id(oldest)?)
            .map_err(|e| GitError::from_git2(e, oldest.as_str()))?;

        let mut out = Vec::new();
        for oid in revwalk {
            out.push(Self::to_oid(oid.map_err(GitError::internal)?)?);
        }
        Ok(out)
    }

    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        // A commit is its own ancestor
        if ancestor == descendant {
            return Ok(true);
        }

        let descendant_id = self.commit_id(descendant)?;
        let ancestor_id = self.commit_id(ancestor)?;
        self.repo
            .graph_descendant_of(descendant_id, ancestor_id)
            .map_err(GitError::internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod git_error {
        use super::*;

        #[test]
        fn unknown_revision_carries_expression() {
            let err = GitError::UnknownRevision {
                expr: "HEAD~99".to_string(),
            };
            assert_eq!(err.to_string(), "unknown revision: HEAD~99");
        }

        #[test]
        fn not_a_repo_mentions_path() {
            let err = GitError::NotARepo {
                path: PathBuf::from("/tmp/nowhere"),
            };
            assert!(err.to_string().contains("/tmp/nowhere"));
        }

        #[test]
        fn type_error_maps_to_invalid_oid() {
            let err: GitError = TypeError::InvalidOid("bad".into()).into();
            assert!(matches!(err, GitError::InvalidOid { .. }));
        }
    }

    #[test]
    fn open_non_repository_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = Git::open(dir.path());
        assert!(matches!(result, Err(GitError::NotARepo { .. })));
    }
}
