//! core::commit
//!
//! Reportable commit facts and ordered commit ranges.
//!
//! # Types
//!
//! - [`CommitSummary`] - One commit's reportable facts
//! - [`Redactable`] - A field value or the explicit "withheld" sentinel
//! - [`CommitRange`] - Oldest-first commits between an exclusive and an
//!   inclusive bound
//!
//! # Wire Format
//!
//! Summaries serialize with the ledger's field names (`sha1`, `author`,
//! `message`, ...). A redacted field serializes as [`REDACTED_SENTINEL`],
//! never as an empty string, so "the source had nothing" and "the reporter
//! withheld it" stay distinguishable on the ledger side.
//!
//! The sentinel is the ledger's own convention, so it is a plain string. A
//! source value that is literally `**REDACTED**` serializes identically to a
//! withheld field. Only [`Redactable`] tells them apart; code that needs to
//! know whether a field was withheld asks [`Redactable::is_redacted`] before
//! serializing, never the wire form.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::types::Oid;

/// The wire value of a withheld field.
pub const REDACTED_SENTINEL: &str = "**REDACTED**";

/// A field value that may have been withheld before transmission.
///
/// # Example
///
/// ```
/// use trailmark::core::commit::{Redactable, REDACTED_SENTINEL};
///
/// let present = Redactable::Value("alice@example.com".to_string());
/// let withheld: Redactable<String> = Redactable::Redacted;
///
/// assert_eq!(serde_json::to_value(&present).unwrap(), "alice@example.com");
/// assert_eq!(serde_json::to_value(&withheld).unwrap(), REDACTED_SENTINEL);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redactable<T> {
    /// The value as read from the source (possibly empty).
    Value(T),
    /// The value was withheld by a redaction policy.
    Redacted,
}

impl<T> Redactable<T> {
    /// Returns the value, or `None` if it was withheld.
    pub fn value(&self) -> Option<&T> {
        match self {
            Redactable::Value(v) => Some(v),
            Redactable::Redacted => None,
        }
    }

    /// Whether this field was withheld.
    pub fn is_redacted(&self) -> bool {
        matches!(self, Redactable::Redacted)
    }
}

impl<T> From<T> for Redactable<T> {
    fn from(value: T) -> Self {
        Redactable::Value(value)
    }
}

impl<T: Serialize> Serialize for Redactable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Redactable::Value(v) => v.serialize(serializer),
            Redactable::Redacted => serializer.serialize_str(REDACTED_SENTINEL),
        }
    }
}

/// One git commit's reportable facts.
///
/// Produced by [`GitQuery::commit_summary`](crate::git::GitQuery::commit_summary)
/// and never mutated afterwards; redaction returns a modified copy. The
/// identifier, timestamp and parents are plain fields because they are
/// never redactable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    /// Full commit hash
    #[serde(rename = "sha1")]
    pub id: Oid,
    /// Author name
    #[serde(rename = "author")]
    pub author_name: Redactable<String>,
    /// Author email
    pub author_email: Redactable<String>,
    /// Committer name
    #[serde(rename = "committer")]
    pub committer_name: Redactable<String>,
    /// Committer email
    pub committer_email: Redactable<String>,
    /// Full message (subject and body)
    pub message: Redactable<String>,
    /// Commit time
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    /// Parent commit ids, first parent first
    pub parents: Vec<Oid>,
    /// Paths touched relative to the first parent, when collected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_files: Option<Redactable<Vec<String>>>,
}

impl CommitSummary {
    /// First line of the message, if the message was not withheld.
    pub fn subject(&self) -> Option<&str> {
        self.message.value().and_then(|m| m.lines().next())
    }
}

/// How the oldest bound of a range was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundarySource {
    /// The caller named the oldest commit.
    Explicit,
    /// The oldest commit was the last one recorded by the ledger.
    Ledger,
}

/// Record of a range that was cut down to the configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncation {
    /// Commits between the bounds before truncation.
    pub total: usize,
    /// Commits kept (the ones nearest `newest`).
    pub kept: usize,
}

/// Oldest-first commits between `oldest` (exclusive) and `newest` (inclusive).
///
/// When non-empty, the last element is the summary of `newest`. An empty
/// range means `oldest == newest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRange {
    /// Exclusive lower bound
    #[serde(rename = "oldest_commit")]
    pub oldest: Oid,
    /// Inclusive upper bound
    #[serde(rename = "newest_commit")]
    pub newest: Oid,
    /// Oldest-first commit summaries
    #[serde(rename = "commit_list")]
    pub commits: Vec<CommitSummary>,
    /// Where `oldest` came from
    #[serde(skip)]
    pub oldest_source: BoundarySource,
    /// Set when the range was cut to the configured maximum
    #[serde(skip)]
    pub truncation: Option<Truncation>,
}

impl CommitRange {
    /// Whether there are no commits between the bounds.
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Number of commits in the range.
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Commit ids in range order.
    pub fn ids(&self) -> impl Iterator<Item = &Oid> {
        self.commits.iter().map(|c| &c.id)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::summary;
    use super::*;

    #[test]
    fn summary_wire_keys() {
        let json = serde_json::to_value(summary(1)).unwrap();
        assert_eq!(json["sha1"], "01".repeat(20));
        assert_eq!(json["author"], "Alice");
        assert_eq!(json["author_email"], "alice@example.com");
        assert_eq!(json["committer"], "Bob");
        assert_eq!(json["timestamp"], 1_700_000_001);
        assert_eq!(json["changed_files"][0], "src/file1.rs");
    }

    #[test]
    fn redacted_field_serializes_as_sentinel() {
        let mut s = summary(2);
        s.author_email = Redactable::Redacted;
        s.changed_files = Some(Redactable::Redacted);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["author_email"], REDACTED_SENTINEL);
        assert_eq!(json["changed_files"], REDACTED_SENTINEL);
    }

    #[test]
    fn empty_value_is_not_sentinel() {
        let mut s = summary(3);
        s.author_email = String::new().into();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["author_email"], "");
    }

    #[test]
    fn literal_sentinel_text_is_still_a_value() {
        let literal: Redactable<String> = REDACTED_SENTINEL.to_string().into();
        assert!(!literal.is_redacted());
        assert_eq!(literal.value().map(String::as_str), Some(REDACTED_SENTINEL));
        assert_eq!(
            serde_json::to_value(&literal).unwrap(),
            serde_json::to_value(Redactable::<String>::Redacted).unwrap()
        );
    }

    #[test]
    fn uncollected_changed_files_are_omitted() {
        let mut s = summary(4);
        s.changed_files = None;
        let json = serde_json::to_value(&s).unwrap();
        assert!(json.get("changed_files").is_none());
    }

    #[test]
    fn subject_is_first_line() {
        assert_eq!(summary(5).subject(), Some("change 5"));
        let mut s = summary(5);
        s.message = Redactable::Redacted;
        assert_eq!(s.subject(), None);
    }

    #[test]
    fn range_wire_keys() {
        let range = CommitRange {
            oldest: summary(1).id,
            newest: summary(2).id,
            commits: vec![summary(2)],
            oldest_source: BoundarySource::Explicit,
            truncation: None,
        };
        let json = serde_json::to_value(&range).unwrap();
        assert_eq!(json["oldest_commit"], "01".repeat(20));
        assert_eq!(json["newest_commit"], "02".repeat(20));
        assert_eq!(json["commit_list"].as_array().unwrap().len(), 1);
        assert!(json.get("oldest_source").is_none());
    }
}
