//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the repository (when the command needs commits) and loads config
//! 2. Resolves commits and assembles the event
//! 3. Delivers it and reports the outcome
//!
//! # Async Commands
//!
//! Handlers are synchronous. Each one that talks to the ledger starts its own
//! tokio runtime and blocks on the async core; Ctrl-C trips the delivery
//! client's cancel signal instead of killing the process mid-request.

mod approval;
mod completion;
mod config_cmd;
mod evidence;
mod trail;

pub use approval::approval;
pub use completion::completion;
pub use config_cmd::{get as config_get, list as config_list};
pub use evidence::{artifact_evidence, commit_evidence};
pub use trail::trail;

use anyhow::{Context as _, Result};
use tracing::debug;

use crate::cli::args::{
    AnnotationArgs, BeginCommand, Command, ConfigAction, EvidenceCommand, ReportCommand,
    RequestCommand,
};
use crate::cli::context::Globals;
use crate::core::commit::CommitRange;
use crate::core::payload::{EventInputs, EvidenceEvent};
use crate::ledger::{DeliveryOutcome, FileAttachment, HttpTransport, LedgerApi};
use crate::ui::output::{self, Verbosity};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, globals: Globals) -> Result<()> {
    match command {
        Command::Report { what } => match what {
            ReportCommand::Approval(args) => approval(globals, args, true),
            ReportCommand::Evidence { what } => match what {
                EvidenceCommand::Commit(args) => commit_evidence(globals, args),
                EvidenceCommand::Artifact(args) => artifact_evidence(globals, args),
            },
        },
        Command::Request { what } => match what {
            RequestCommand::Approval(args) => approval(globals, args, false),
        },
        Command::Begin { what } => match what {
            BeginCommand::Trail(args) => trail(globals, args),
        },
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_get(globals, &key),
            ConfigAction::List => config_list(globals),
        },
        Command::Completion { shell } => completion(shell),
    }
}

/// What happened to a delivered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivered {
    Created,
    Updated,
    Simulated,
}

impl Delivered {
    /// Past-tense verb for outcome messages, `None` for a dry run.
    pub(crate) fn verb(self, created: &'static str) -> Option<&'static str> {
        match self {
            Delivered::Created => Some(created),
            Delivered::Updated => Some("updated"),
            Delivered::Simulated => None,
        }
    }
}

/// Send `event`, printing the request instead on a dry run.
pub(crate) async fn deliver(
    ledger: &LedgerApi<HttpTransport>,
    event: &EvidenceEvent,
    verbosity: Verbosity,
) -> Result<Delivered> {
    deliver_with(ledger, event, None, verbosity).await
}

/// [`deliver`] with a file uploaded next to the payload.
pub(crate) async fn deliver_with(
    ledger: &LedgerApi<HttpTransport>,
    event: &EvidenceEvent,
    attachment: Option<FileAttachment>,
    verbosity: Verbosity,
) -> Result<Delivered> {
    let outcome = ledger
        .send_event_with(event, attachment)
        .await
        .with_context(|| format!("failed to report {}", event.kind.label()))?;

    Ok(match outcome {
        DeliveryOutcome::Simulated(request) => {
            output::print(output::format_dry_run(&request), verbosity);
            Delivered::Simulated
        }
        DeliveryOutcome::Created(response) => {
            debug!(status = response.status, attempts = response.attempts, "delivered");
            Delivered::Created
        }
        DeliveryOutcome::Updated(response) => {
            debug!(status = response.status, attempts = response.attempts, "delivered");
            Delivered::Updated
        }
    })
}

/// Tell the user about a truncated or empty range.
pub(crate) fn announce_range(range: &CommitRange, verbosity: Verbosity) {
    if let Some(warning) = output::truncation_warning(range) {
        output::warn(warning, verbosity);
    }
    if range.is_empty() {
        output::print("no new commits", verbosity);
    } else if verbosity == Verbosity::Debug {
        output::print(output::format_commit_list(range), verbosity);
    }
}

/// Copy user data and external references into `inputs`.
pub(crate) fn annotate(inputs: &mut EventInputs, annotations: AnnotationArgs) {
    inputs.user_data_file = annotations.user_data;
    inputs.external_urls = annotations.external_urls;
    inputs.external_fingerprints = annotations.external_fingerprints;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_has_no_verb() {
        assert_eq!(Delivered::Created.verb("begun"), Some("begun"));
        assert_eq!(Delivered::Updated.verb("begun"), Some("updated"));
        assert_eq!(Delivered::Simulated.verb("created"), None);
    }
}
