//! git::revision
//!
//! Revision expression parsing.
//!
//! Expressions such as `HEAD~3`, `main^2~1` or an abbreviated hash are
//! parsed into a [`RevisionExpr`]: a base name plus ancestry steps. The
//! [`Git`](super::Git) interface resolves the base and walks the steps, so
//! the range logic never sees expression syntax. Parsing sits behind the
//! [`RevisionSyntax`] trait so another grammar can be swapped in.

use super::GitError;

/// One ancestry step applied after resolving the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AncestryStep {
    /// Follow the first parent `n` times (`~n`).
    FirstParent(usize),
    /// Select the `n`th parent, 1-based (`^n`); `^0` is the commit itself.
    Parent(usize),
}

/// A parsed revision expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionExpr {
    /// Ref name or (possibly abbreviated) hash.
    pub base: String,
    /// Steps applied left to right.
    pub steps: Vec<AncestryStep>,
}

/// Strategy for turning user text into a [`RevisionExpr`].
pub trait RevisionSyntax: Send + Sync {
    /// Parse `expr`.
    ///
    /// # Errors
    ///
    /// [`GitError::UnknownRevision`] carrying `expr` when it is malformed.
    fn parse(&self, expr: &str) -> Result<RevisionExpr, GitError>;
}

/// The `~n` / `^n` suffix grammar used by git itself.
///
/// # Example
///
/// ```
/// use trailmark::git::{AncestryStep, GitRevisionSyntax, RevisionSyntax};
///
/// let parsed = GitRevisionSyntax.parse("main^2~3").unwrap();
/// assert_eq!(parsed.base, "main");
/// assert_eq!(
///     parsed.steps,
///     vec![AncestryStep::Parent(2), AncestryStep::FirstParent(3)]
/// );
///
/// let head = GitRevisionSyntax.parse("@~").unwrap();
/// assert_eq!(head.base, "HEAD");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct GitRevisionSyntax;

impl RevisionSyntax for GitRevisionSyntax {
    fn parse(&self, expr: &str) -> Result<RevisionExpr, GitError> {
        let unknown = || GitError::UnknownRevision {
            expr: expr.to_string(),
        };

        let trimmed = expr.trim();
        let split = trimmed.find(['~', '^']).unwrap_or(trimmed.len());
        let (base, mut rest) = trimmed.split_at(split);

        if base.is_empty() || base.contains(char::is_whitespace) {
            return Err(unknown());
        }
        let base = if base == "@" { "HEAD" } else { base };

        let mut steps = Vec::new();
        while let Some(op) = rest.chars().next() {
            rest = &rest[op.len_utf8()..];
            let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            let n = if digits == 0 {
                1
            } else {
                rest[..digits].parse::<usize>().map_err(|_| unknown())?
            };
            rest = &rest[digits..];

            steps.push(match op {
                '~' => AncestryStep::FirstParent(n),
                '^' => AncestryStep::Parent(n),
                _ => return Err(unknown()),
            });
        }

        Ok(RevisionExpr {
            base: base.to_string(),
            steps,
        })
    }
}
