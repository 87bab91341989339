//! core::redact
//!
//! Withholding commit metadata before it leaves the process.
//!
//! A [`RedactionPolicy`] names the [`CommitField`]s to suppress. [`apply`]
//! returns a copy of a summary with those fields replaced by
//! [`Redactable::Redacted`]. The commit id, timestamp and parents have no
//! `CommitField` variant, so they cannot be named in a policy at all and the
//! structure of a range stays verifiable even when its content is withheld.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::commit::{CommitRange, CommitSummary, Redactable};

/// Errors from parsing redaction settings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RedactionError {
    #[error("'{name}' cannot be redacted; allowed values are: {allowed}")]
    InvalidRedactionField { name: String, allowed: String },
}

/// A commit field that may be withheld.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitField {
    AuthorEmail,
    AuthorName,
    CommitterEmail,
    CommitterName,
    Message,
    ChangedFiles,
}

impl CommitField {
    /// Every redactable field.
    pub const ALL: [CommitField; 6] = [
        CommitField::AuthorEmail,
        CommitField::AuthorName,
        CommitField::CommitterEmail,
        CommitField::CommitterName,
        CommitField::Message,
        CommitField::ChangedFiles,
    ];

    /// The user-facing name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitField::AuthorEmail => "author_email",
            CommitField::AuthorName => "author_name",
            CommitField::CommitterEmail => "committer_email",
            CommitField::CommitterName => "committer_name",
            CommitField::Message => "message",
            CommitField::ChangedFiles => "changed_files",
        }
    }
}

impl fmt::Display for CommitField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names accepted on the command line, including the `author` and
/// `committer` shorthands.
const ACCEPTED_NAMES: &[&str] = &[
    "author",
    "author_email",
    "author_name",
    "committer",
    "committer_email",
    "committer_name",
    "message",
    "changed_files",
];

/// The set of commit fields to withhold. Empty by default.
///
/// # Example
///
/// ```
/// use trailmark::core::redact::{CommitField, RedactionPolicy};
///
/// let policy = RedactionPolicy::parse(["author", "message"]).unwrap();
/// assert!(policy.contains(CommitField::AuthorEmail));
/// assert!(policy.contains(CommitField::AuthorName));
/// assert!(policy.contains(CommitField::Message));
/// assert!(!policy.contains(CommitField::ChangedFiles));
///
/// assert!(RedactionPolicy::parse(["sha1"]).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RedactionPolicy {
    fields: BTreeSet<CommitField>,
}

impl RedactionPolicy {
    /// A policy that withholds nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a policy from explicit fields.
    pub fn from_fields(fields: impl IntoIterator<Item = CommitField>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// Parse user-facing names, expanding the `author`/`committer` shorthands.
    ///
    /// # Errors
    ///
    /// [`RedactionError::InvalidRedactionField`] for any unknown name,
    /// including the never-redactable ones (`sha1`, `timestamp`, ...).
    pub fn parse<I, S>(names: I) -> Result<Self, RedactionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fields = BTreeSet::new();
        for name in names {
            let name = name.as_ref().trim();
            match name {
                "author" => {
                    fields.insert(CommitField::AuthorName);
                    fields.insert(CommitField::AuthorEmail);
                }
                "committer" => {
                    fields.insert(CommitField::CommitterName);
                    fields.insert(CommitField::CommitterEmail);
                }
                other => {
                    fields.insert(other.parse::<CommitField>()?);
                }
            }
        }
        Ok(Self { fields })
    }

    /// Merge another policy into this one.
    pub fn union(mut self, other: &RedactionPolicy) -> Self {
        self.fields.extend(other.fields.iter().copied());
        self
    }

    /// Whether `field` is withheld by this policy.
    pub fn contains(&self, field: CommitField) -> bool {
        self.fields.contains(&field)
    }

    /// Whether the policy withholds nothing.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The withheld fields in a stable order.
    pub fn fields(&self) -> impl Iterator<Item = CommitField> + '_ {
        self.fields.iter().copied()
    }
}

impl FromStr for CommitField {
    type Err = RedactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommitField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| RedactionError::InvalidRedactionField {
                name: s.to_string(),
                allowed: ACCEPTED_NAMES.join(", "),
            })
    }
}

fn withhold<T>(field: &mut Redactable<T>) {
    *field = Redactable::Redacted;
}

/// Return a copy of `summary` with every field in `policy` withheld.
///
/// Fields not named by the policy are left exactly as they were, so an
/// empty policy returns a value equal to the input.
pub fn apply(summary: &CommitSummary, policy: &RedactionPolicy) -> CommitSummary {
    let mut out = summary.clone();
    for field in policy.fields() {
        match field {
            CommitField::AuthorEmail => withhold(&mut out.author_email),
            CommitField::AuthorName => withhold(&mut out.author_name),
            CommitField::CommitterEmail => withhold(&mut out.committer_email),
            CommitField::CommitterName => withhold(&mut out.committer_name),
            CommitField::Message => withhold(&mut out.message),
            CommitField::ChangedFiles => {
                // Not collected stays not collected.
                if let Some(files) = out.changed_files.as_mut() {
                    withhold(files);
                }
            }
        }
    }
    out
}

/// Apply `policy` independently to every element of a range.
///
/// Order, bounds and length are preserved.
pub fn apply_to_range(range: &CommitRange, policy: &RedactionPolicy) -> CommitRange {
    if policy.is_empty() {
        return range.clone();
    }
    CommitRange {
        commits: range.commits.iter().map(|c| apply(c, policy)).collect(),
        ..range.clone()
    }
}
