//! Trailmark - report CI/CD compliance evidence to a ledger
//!
//! Trailmark runs inside a pipeline and records approvals, trails and
//! evidence against a remote compliance ledger. Each report names the git
//! commits it covers, with selected commit fields withheld on request, and
//! is delivered with bounded retries or printed instead on a dry run.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, wires the layers)
//! - [`core`] - Domain types, range resolution, redaction, payloads, config
//! - [`git`] - Read-only repository queries
//! - [`ledger`] - Delivery client, HTTP transport and ledger routes
//! - [`ui`] - User-facing output
//! - [`telemetry`] - Tracing subscriber setup
//!
//! # Invariants
//!
//! 1. A range's commits are exactly those reachable from its newest commit
//!    and not from its oldest, oldest first
//! 2. Redaction happens before serialization; withheld values never reach
//!    the wire
//! 3. A dry run transmits no writes
//! 4. Retries resend the identical request to the same resource

pub mod cli;
pub mod core;
pub mod git;
pub mod ledger;
pub mod telemetry;
pub mod ui;
