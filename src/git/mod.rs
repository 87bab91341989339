//! git
//!
//! Single interface for all Git reads.
//!
//! # Architecture
//!
//! This module is the **only doorway** to Git. Commit-range logic consumes
//! the [`GitQuery`] trait; [`Git`] implements it over `git2`. No other
//! module imports `git2` or shells out to the git CLI.
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - Revision expression resolution (via a swappable [`RevisionSyntax`])
//! - Commit metadata reads
//! - Ancestry queries (exclusive walks, is-ancestor)
//!
//! # Invariants
//!
//! - Nothing in this module writes to the repository
//! - All operations return strong types ([`Oid`](crate::core::types::Oid),
//!   [`CommitSummary`](crate::core::commit::CommitSummary))

mod interface;
mod revision;

pub use interface::{Git, GitError, GitQuery};
pub use revision::{AncestryStep, GitRevisionSyntax, RevisionExpr, RevisionSyntax};
