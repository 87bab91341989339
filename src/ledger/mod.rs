//! ledger
//!
//! Talking to the remote compliance ledger.
//!
//! # Modules
//!
//! - [`client`] - Retrying, dry-run aware delivery of prepared requests
//! - [`http`] - `reqwest` transport
//! - [`api`] - Ledger routes, event delivery and the latest-commit read
//! - [`traits`] - The [`LedgerLookup`] read capability
//! - [`cancel`] - Cooperative cancellation between attempts
//! - [`mock`] - In-memory ledger for tests
//!
//! # Invariants
//!
//! - Credentials never appear in `Debug` output or logs
//! - Attempts of one delivery never overlap
//! - A retried write carries the byte-identical body of the first attempt

pub mod api;
pub mod cancel;
pub mod client;
pub mod http;
pub mod mock;
pub mod traits;

pub use api::LedgerApi;
pub use cancel::CancelSignal;
pub use client::{
    Auth, DeliveryClient, DeliveryError, DeliveryOutcome, FileAttachment, LedgerResponse,
    PreparedRequest, RetryPolicy, Transport, TransportError, TransportResponse,
};
pub use http::HttpTransport;
pub use traits::{LedgerError, LedgerLookup, LookupKey};
