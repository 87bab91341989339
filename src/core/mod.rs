//! core
//!
//! Core domain types and the reporting pipeline.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Oid, Fingerprint, ResourceName
//! - [`commit`] - Commit summaries and ranges
//! - [`range`] - Commit range resolution (explicit or ledger-inferred bounds)
//! - [`redact`] - Withholding commit fields before transmission
//! - [`payload`] - Assembly of the event sent to the ledger
//! - [`user_data`] - User-supplied structured data
//! - [`fingerprint`] - Artifact identity
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Nothing here stores state between invocations
//! - Errors are returned as typed values; rendering is the CLI's job

pub mod commit;
pub mod config;
pub mod fingerprint;
pub mod payload;
pub mod range;
pub mod redact;
pub mod types;
pub mod user_data;
