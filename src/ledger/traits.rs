//! ledger::traits
//!
//! The read capability the commit-range resolver depends on.
//!
//! # Design
//!
//! Boundary inference needs exactly one fact from the ledger: the last
//! commit reported for a flow and environment. That query is injected as a
//! [`LedgerLookup`] instead of reaching for a global client, so the resolver
//! can be driven by [`MockLedger`](super::mock::MockLedger) in tests.

use async_trait::async_trait;
use thiserror::Error;

use super::client::DeliveryError;
use crate::core::types::{Oid, ResourceName};

/// Errors from ledger reads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The request failed.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// The ledger answered with something we could not interpret.
    #[error("unexpected ledger response: {message}")]
    InvalidResponse {
        /// What was wrong with it
        message: String,
    },
}

/// Identity of an environment's history within a flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    /// Organization
    pub org: ResourceName,
    /// Flow the events were reported to
    pub flow: ResourceName,
    /// Deployment environment
    pub environment: ResourceName,
}

/// Read access to prior ledger state.
#[async_trait]
pub trait LedgerLookup: Send + Sync {
    /// The most recent commit reported for `key`, or `None` if there is none.
    async fn last_reported_commit(&self, key: &LookupKey) -> Result<Option<Oid>, LedgerError>;
}
