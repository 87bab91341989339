//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Results go to stdout and respect the quiet flag; warnings and errors go
//! to stderr. Diagnostics belong to `tracing`, not to this module.

use std::fmt::Display;

use crate::core::commit::CommitRange;
use crate::ledger::PreparedRequest;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("Error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("Warning: {}", message);
    }
}

/// Render a request that was built but not sent.
pub fn format_dry_run(request: &PreparedRequest) -> String {
    let mut out = format!(
        "############### THIS IS A DRY-RUN ###############\n{} {}",
        request.method, request.url
    );
    if let Some(body) = request.pretty_body() {
        out.push_str("\nthis is the payload that would be sent in real run:\n");
        out.push_str(&body);
    }
    if let Some(file) = &request.attachment {
        out.push_str(&format!(
            "\nwith file '{}' attached as {} ({} bytes)",
            file.file_name,
            file.field,
            file.bytes.len()
        ));
    }
    out
}

/// One line per commit: short id and subject.
pub fn format_commit_list(range: &CommitRange) -> String {
    range
        .commits
        .iter()
        .map(|c| format!("  {} {}", c.id.short(7), c.subject().unwrap_or("(redacted)")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Warning text for a range cut to the configured maximum, if it was.
pub fn truncation_warning(range: &CommitRange) -> Option<String> {
    range.truncation.map(|t| {
        format!(
            "commit range contains {} commits; only the {} most recent were included",
            t.total, t.kept
        )
    })
}
