//! ledger::api
//!
//! The compliance ledger's HTTP API.
//!
//! # Routes
//!
//! All writes are `PUT`s addressed by content so a retried delivery lands on
//! the same resource:
//!
//! | Event              | Route                                                         |
//! |--------------------|---------------------------------------------------------------|
//! | Approval           | `/api/v2/approvals/{org}/{flow}/artifacts/{fingerprint}`      |
//! | Approval (env)     | `/api/v2/approvals/{org}/{flow}/environments/{env}/artifacts/{fingerprint}` |
//! | Trail              | `/api/v2/trails/{org}/{flow}`                                 |
//! | Commit evidence    | `/api/v2/evidence/{org}/commit/{sha1}`                        |
//! | Artifact evidence  | `/api/v2/evidence/{org}/artifact/{flow}/{fingerprint}`        |
//!
//! The one read, `GET /api/v2/approvals/{org}/{flow}/latest-commit?environment={env}`,
//! backs [`LedgerLookup`]. Path segments are percent-encoded.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use super::client::{
    DeliveryClient, DeliveryError, DeliveryOutcome, FileAttachment, PreparedRequest, Transport,
};
use super::traits::{LedgerError, LedgerLookup, LookupKey};
use crate::core::payload::{EventKind, EvidenceEvent};
use crate::core::types::{Oid, ResourceName};

/// Body of the latest-commit read.
#[derive(Debug, Deserialize)]
struct LatestCommitResponse {
    commit: Option<String>,
}

/// Client for one organization on one ledger host.
#[derive(Debug)]
pub struct LedgerApi<T> {
    host: Url,
    org: ResourceName,
    client: DeliveryClient<T>,
}

impl<T: Transport> LedgerApi<T> {
    /// Create an API client.
    ///
    /// # Errors
    ///
    /// [`DeliveryError::InvalidRequest`] if `host` is not an absolute
    /// http(s) URL.
    pub fn new(host: &str, org: ResourceName, client: DeliveryClient<T>) -> Result<Self, DeliveryError> {
        let host = Url::parse(host).map_err(|e| DeliveryError::InvalidRequest {
            message: format!("invalid host '{host}': {e}"),
        })?;
        if host.cannot_be_a_base() || !matches!(host.scheme(), "http" | "https") {
            return Err(DeliveryError::InvalidRequest {
                message: format!("host must be an http(s) URL: {host}"),
            });
        }
        Ok(Self { host, org, client })
    }

    /// The organization events are reported to.
    pub fn org(&self) -> &ResourceName {
        &self.org
    }

    /// The underlying delivery client.
    pub fn client(&self) -> &DeliveryClient<T> {
        &self.client
    }

    /// Build `{host}/{segments...}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, DeliveryError> {
        let mut url = self.host.clone();
        url.path_segments_mut()
            .map_err(|_| DeliveryError::InvalidRequest {
                message: format!("host cannot carry a path: {}", self.host),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// The write route for `event`.
    pub fn event_url(&self, event: &EvidenceEvent) -> Result<Url, DeliveryError> {
        let org = self.org.as_str();
        let missing = |what: &str| DeliveryError::InvalidRequest {
            message: format!("{} events need {what}", event.kind.label()),
        };
        let flow = || {
            event
                .target
                .flow
                .as_ref()
                .map(ResourceName::as_str)
                .ok_or_else(|| missing("a flow"))
        };
        let fingerprint = || {
            event
                .artifact_fingerprint
                .as_ref()
                .map(|f| f.as_str())
                .ok_or_else(|| missing("an artifact fingerprint"))
        };

        match &event.kind {
            EventKind::Approval { .. } => match &event.target.environment {
                Some(env) => self.url(&[
                    "api", "v2", "approvals", org, flow()?, "environments", env.as_str(),
                    "artifacts", fingerprint()?,
                ]),
                None => self.url(&["api", "v2", "approvals", org, flow()?, "artifacts", fingerprint()?]),
            },
            EventKind::Trail { .. } => self.url(&["api", "v2", "trails", org, flow()?]),
            EventKind::CommitEvidence { .. } => {
                let sha = event
                    .commit
                    .as_ref()
                    .map(|c| c.id.as_str())
                    .ok_or_else(|| missing("a commit"))?;
                self.url(&["api", "v2", "evidence", org, "commit", sha])
            }
            EventKind::ArtifactEvidence { .. } => {
                self.url(&["api", "v2", "evidence", org, "artifact", flow()?, fingerprint()?])
            }
        }
    }

    /// Prepare the write for `event` without sending it.
    pub fn prepare(&self, event: &EvidenceEvent) -> Result<PreparedRequest, DeliveryError> {
        PreparedRequest::put_json(self.event_url(event)?, event)
    }

    /// Deliver `event`, honoring the client's dry-run setting.
    pub async fn send_event(&self, event: &EvidenceEvent) -> Result<DeliveryOutcome, DeliveryError> {
        self.send_event_with(event, None).await
    }

    /// Deliver `event` with an optional file, e.g. a trail's flow template.
    pub async fn send_event_with(
        &self,
        event: &EvidenceEvent,
        attachment: Option<FileAttachment>,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let mut request = self.prepare(event)?;
        if let Some(attachment) = attachment {
            request = request.with_attachment(attachment);
        }
        self.client.send(request).await
    }
}

#[async_trait]
impl<T: Transport> LedgerLookup for LedgerApi<T> {
    async fn last_reported_commit(&self, key: &LookupKey) -> Result<Option<Oid>, LedgerError> {
        let mut url = self.url(&[
            "api",
            "v2",
            "approvals",
            key.org.as_str(),
            key.flow.as_str(),
            "latest-commit",
        ])?;
        url.query_pairs_mut()
            .append_pair("environment", key.environment.as_str());

        let response = match self.client.fetch(&PreparedRequest::get(url)).await {
            Ok(response) => response,
            Err(DeliveryError::Rejected { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let parsed: LatestCommitResponse =
            serde_json::from_str(&response.body).map_err(|e| LedgerError::InvalidResponse {
                message: e.to_string(),
            })?;

        match parsed.commit.filter(|c| !c.is_empty()) {
            Some(sha) => Oid::new(sha)
                .map(Some)
                .map_err(|e| LedgerError::InvalidResponse {
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }
}
