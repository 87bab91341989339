//! core::payload
//!
//! Assembly of the event sent to the ledger.
//!
//! # Design
//!
//! [`EvidencePayloadBuilder::build`] turns [`EventInputs`] into an immutable
//! [`EvidenceEvent`]. It validates the artifact identity, merges user data,
//! normalizes external references, redacts commit metadata and checks that
//! the commit attachment matches the event kind:
//!
//! | Kind               | Artifact | Commits              |
//! |--------------------|----------|----------------------|
//! | `Approval`         | required | range                |
//! | `Trail`            | none     | optional single      |
//! | `CommitEvidence`   | none     | required single      |
//! | `ArtifactEvidence` | required | none                 |
//!
//! The only I/O performed is the optional user-data file read and, when the
//! artifact is identified by type, whatever the [`Fingerprinter`] does.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::commit::{CommitRange, CommitSummary};
use super::fingerprint::{ArtifactIdentity, FingerprintError, Fingerprinter};
use super::redact::{self, RedactionPolicy};
use super::types::{Fingerprint, ResourceName, TypeError};
use super::user_data;

/// Errors from assembling an event.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error(transparent)]
    Artifact(#[from] FingerprintError),

    #[error("failed to load user data from '{path}': {reason}")]
    UserDataUnreadable { path: PathBuf, reason: String },

    #[error("invalid external reference: {reason}")]
    InvalidExternalReference { reason: String },

    #[error("external fingerprint '{name}' has no matching external URL")]
    OrphanExternalFingerprint { name: String },

    #[error("invalid external fingerprint for '{name}': {source}")]
    InvalidExternalFingerprint { name: String, source: TypeError },

    #[error("{kind} events take {expected}")]
    AttachmentMismatch {
        kind: &'static str,
        expected: &'static str,
    },
}

/// Where an event is reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventTarget {
    /// Flow the event belongs to; part of the route, not the body
    #[serde(skip)]
    pub flow: Option<ResourceName>,
    /// Environment the event concerns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<ResourceName>,
}

/// Kind-specific event fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventKind {
    /// An approval, or with `approved == false` a request for one.
    Approval {
        approved: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        approver: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// The start (or update) of a named trail.
    Trail {
        name: ResourceName,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        origin_url: Option<String>,
    },
    /// Evidence attached to a commit across one or more flows.
    CommitEvidence {
        name: ResourceName,
        flows: Vec<ResourceName>,
        build_url: String,
        #[serde(rename = "is_compliant")]
        compliant: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// Evidence attached to an artifact.
    ArtifactEvidence {
        name: ResourceName,
        build_url: String,
        #[serde(rename = "is_compliant")]
        compliant: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

/// What commit information an event kind carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attaches {
    Range,
    Commit { required: bool },
    Nothing,
}

impl EventKind {
    /// Short name used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Approval { approved: true, .. } => "approval",
            EventKind::Approval { approved: false, .. } => "approval request",
            EventKind::Trail { .. } => "trail",
            EventKind::CommitEvidence { .. } => "commit evidence",
            EventKind::ArtifactEvidence { .. } => "artifact evidence",
        }
    }

    /// Whether the kind is addressed by an artifact fingerprint.
    pub fn requires_artifact(&self) -> bool {
        matches!(
            self,
            EventKind::Approval { .. } | EventKind::ArtifactEvidence { .. }
        )
    }

    /// Whether the kind carries a commit range.
    pub fn is_range_based(&self) -> bool {
        self.attaches() == Attaches::Range
    }

    fn attaches(&self) -> Attaches {
        match self {
            EventKind::Approval { .. } => Attaches::Range,
            EventKind::Trail { .. } => Attaches::Commit { required: false },
            EventKind::CommitEvidence { .. } => Attaches::Commit { required: true },
            EventKind::ArtifactEvidence { .. } => Attaches::Nothing,
        }
    }
}

/// Commit information supplied for an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommitAttachment {
    #[default]
    None,
    Range(CommitRange),
    Commit(CommitSummary),
}

/// A cross-link to an external system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
}

/// Build the `external_urls` map from ordered `(name, url)` and
/// `(name, fingerprint)` pairs.
///
/// Duplicate names overwrite earlier entries.
///
/// # Errors
///
/// - [`PayloadError::InvalidExternalReference`] for an empty name or URL
/// - [`PayloadError::OrphanExternalFingerprint`] when a fingerprint names no URL
/// - [`PayloadError::InvalidExternalFingerprint`] for a malformed digest
pub fn external_references(
    urls: &[(String, String)],
    fingerprints: &[(String, String)],
) -> Result<BTreeMap<String, ExternalUrl>, PayloadError> {
    let mut out = BTreeMap::new();

    for (name, url) in urls {
        let name = name.trim();
        if name.is_empty() {
            return Err(PayloadError::InvalidExternalReference {
                reason: format!("empty name for URL '{url}'"),
            });
        }
        if url.trim().is_empty() {
            return Err(PayloadError::InvalidExternalReference {
                reason: format!("empty URL for '{name}'"),
            });
        }
        out.insert(
            name.to_string(),
            ExternalUrl {
                url: url.trim().to_string(),
                fingerprint: None,
            },
        );
    }

    for (name, fingerprint) in fingerprints {
        let name = name.trim();
        if name.is_empty() {
            return Err(PayloadError::InvalidExternalReference {
                reason: "empty name for external fingerprint".into(),
            });
        }
        let entry = out
            .get_mut(name)
            .ok_or_else(|| PayloadError::OrphanExternalFingerprint {
                name: name.to_string(),
            })?;
        let digest = Fingerprint::new(fingerprint.trim()).map_err(|source| {
            PayloadError::InvalidExternalFingerprint {
                name: name.to_string(),
                source,
            }
        })?;
        entry.fingerprint = Some(digest);
    }

    Ok(out)
}

/// Everything the builder needs for one event.
#[derive(Debug, Clone)]
pub struct EventInputs {
    pub target: EventTarget,
    pub kind: EventKind,
    /// Required for artifact-addressed kinds, ignored otherwise
    pub artifact: Option<ArtifactIdentity>,
    pub commits: CommitAttachment,
    /// Inline user data, merged under the file's keys
    pub user_data: Value,
    pub user_data_file: Option<PathBuf>,
    pub external_urls: Vec<(String, String)>,
    pub external_fingerprints: Vec<(String, String)>,
    pub redaction: RedactionPolicy,
}

impl EventInputs {
    /// Inputs for `kind` with everything else empty.
    pub fn new(kind: EventKind, target: EventTarget) -> Self {
        Self {
            target,
            kind,
            artifact: None,
            commits: CommitAttachment::None,
            user_data: Value::Null,
            user_data_file: None,
            external_urls: Vec::new(),
            external_fingerprints: Vec::new(),
            redaction: RedactionPolicy::none(),
        }
    }
}

/// The unit of transmission. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceEvent {
    #[serde(flatten)]
    pub target: EventTarget,
    #[serde(flatten)]
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_fingerprint: Option<Fingerprint>,
    #[serde(flatten)]
    pub range: Option<CommitRange>,
    #[serde(rename = "git_commit_info", skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitSummary>,
    pub user_data: Value,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub external_urls: BTreeMap<String, ExternalUrl>,
}

/// Composes [`EvidenceEvent`]s.
pub struct EvidencePayloadBuilder<'a> {
    fingerprinter: &'a dyn Fingerprinter,
}

impl<'a> EvidencePayloadBuilder<'a> {
    pub fn new(fingerprinter: &'a dyn Fingerprinter) -> Self {
        Self { fingerprinter }
    }

    /// Assemble an event.
    pub fn build(&self, inputs: EventInputs) -> Result<EvidenceEvent, PayloadError> {
        let EventInputs {
            target,
            kind,
            artifact,
            commits,
            user_data,
            user_data_file,
            external_urls,
            external_fingerprints,
            redaction,
        } = inputs;

        let artifact_fingerprint = if kind.requires_artifact() {
            let identity = artifact.unwrap_or_default();
            Some(identity.resolve(self.fingerprinter)?)
        } else {
            None
        };

        let mismatch = |expected| PayloadError::AttachmentMismatch {
            kind: kind.label(),
            expected,
        };
        let (range, commit) = match (kind.attaches(), commits) {
            (Attaches::Range, CommitAttachment::Range(range)) => {
                (Some(redact::apply_to_range(&range, &redaction)), None)
            }
            (Attaches::Range, _) => return Err(mismatch("a commit range")),
            (Attaches::Commit { .. }, CommitAttachment::Commit(summary)) => {
                (None, Some(redact::apply(&summary, &redaction)))
            }
            (Attaches::Commit { required: false }, CommitAttachment::None) => (None, None),
            (Attaches::Commit { .. }, _) => return Err(mismatch("a single commit")),
            (Attaches::Nothing, CommitAttachment::None) => (None, None),
            (Attaches::Nothing, _) => return Err(mismatch("no commit information")),
        };

        let user_data = user_data::merge(user_data, user_data_file.as_deref())?;
        let external_urls = external_references(&external_urls, &external_fingerprints)?;

        tracing::debug!(
            kind = kind.label(),
            commits = range.as_ref().map_or(0, |r| r.len()),
            external_refs = external_urls.len(),
            "assembled event"
        );

        Ok(EvidenceEvent {
            target,
            kind,
            artifact_fingerprint,
            range,
            commit,
            user_data,
            external_urls,
        })
    }
}
