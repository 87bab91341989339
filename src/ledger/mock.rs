//! ledger::mock
//!
//! In-memory ledger for deterministic testing.
//!
//! # Design
//!
//! [`MockLedger`] answers [`LedgerLookup`] queries from a table of prior
//! reports, records every lookup it receives, and can be configured to fail.
//!
//! # Example
//!
//! ```
//! use trailmark::core::types::{Oid, ResourceName};
//! use trailmark::ledger::mock::MockLedger;
//! use trailmark::ledger::{LedgerLookup, LookupKey};
//!
//! # tokio_test::block_on(async {
//! let key = LookupKey {
//!     org: ResourceName::new("acme").unwrap(),
//!     flow: ResourceName::new("backend").unwrap(),
//!     environment: ResourceName::new("staging").unwrap(),
//! };
//! let sha = Oid::new("a".repeat(40)).unwrap();
//! let ledger = MockLedger::new().with_commit(key.clone(), sha.clone());
//!
//! assert_eq!(ledger.last_reported_commit(&key).await.unwrap(), Some(sha));
//! assert_eq!(ledger.lookups(), vec![key]);
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{LedgerError, LedgerLookup, LookupKey};
use crate::core::types::Oid;

/// Mock ledger for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone, Default)]
pub struct MockLedger {
    inner: Arc<Mutex<MockLedgerInner>>,
}

#[derive(Debug, Default)]
struct MockLedgerInner {
    /// Last reported commit per environment.
    commits: HashMap<LookupKey, Oid>,
    /// Error returned by every lookup, when set.
    fail_with: Option<LedgerError>,
    /// Recorded lookups for verification.
    lookups: Vec<LookupKey>,
}

impl MockLedger {
    /// Create an empty mock ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `commit` as the last one reported for `key`.
    pub fn with_commit(self, key: LookupKey, commit: Oid) -> Self {
        self.lock().commits.insert(key, commit);
        self
    }

    /// Make every lookup fail with `err`.
    pub fn fail_with(self, err: LedgerError) -> Self {
        self.lock().fail_with = Some(err);
        self
    }

    /// All lookups received so far.
    pub fn lookups(&self) -> Vec<LookupKey> {
        self.lock().lookups.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockLedgerInner> {
        // A poisoned lock only means another test thread panicked.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LedgerLookup for MockLedger {
    async fn last_reported_commit(&self, key: &LookupKey) -> Result<Option<Oid>, LedgerError> {
        let mut inner = self.lock();
        inner.lookups.push(key.clone());
        if let Some(err) = &inner.fail_with {
            return Err(err.clone());
        }
        Ok(inner.commits.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ResourceName;
    use crate::ledger::DeliveryError;

    fn key(env: &str) -> LookupKey {
        LookupKey {
            org: ResourceName::new("acme").unwrap(),
            flow: ResourceName::new("web").unwrap(),
            environment: ResourceName::new(env).unwrap(),
        }
    }

    #[tokio::test]
    async fn unknown_environment_is_none() {
        let ledger = MockLedger::new().with_commit(key("prod"), Oid::new("b".repeat(40)).unwrap());
        assert_eq!(ledger.last_reported_commit(&key("staging")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn configured_failure_is_returned_and_recorded() {
        let ledger = MockLedger::new().fail_with(LedgerError::Delivery(DeliveryError::Cancelled));
        let err = ledger.last_reported_commit(&key("prod")).await.unwrap_err();
        assert_eq!(err, LedgerError::Delivery(DeliveryError::Cancelled));
        assert_eq!(ledger.lookups().len(), 1);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let ledger = MockLedger::new();
        let other = ledger.clone();
        other.last_reported_commit(&key("qa")).await.unwrap();
        assert_eq!(ledger.lookups(), vec![key("qa")]);
    }
}
