//! trail command - Begin or update a trail

use anyhow::{bail, Context as _, Result};
use tracing::debug;

use super::{annotate, deliver_with};
use crate::cli::args::TrailArgs;
use crate::cli::context::{runtime, Context, Globals};
use crate::core::fingerprint::FileFingerprinter;
use crate::core::payload::{
    CommitAttachment, EventInputs, EventKind, EventTarget, EvidencePayloadBuilder,
};
use crate::core::range::CommitRangeResolver;
use crate::core::types::ResourceName;
use crate::git::Git;
use crate::ledger::{CancelSignal, FileAttachment};
use crate::ui::output;

/// Begin a trail, bound to a commit when run inside a repository.
pub fn trail(globals: Globals, args: TrailArgs) -> Result<()> {
    let git = match Git::open(&args.repo.repo_root) {
        Ok(git) => Some(git),
        Err(_) if args.commit.is_none() => {
            debug!(path = %args.repo.repo_root.display(), "no repository, trail has no commit");
            None
        }
        Err(err) => {
            return Err(anyhow::Error::new(err).context("--commit needs a git repository"))
        }
    };
    let ctx = Context::load(globals, git.as_ref().map(Git::git_dir))?;
    let flow = ctx.flow(args.flow.as_deref())?;
    let name = ResourceName::new(args.name.as_str()).context("invalid trail name")?;
    let redaction = ctx.redaction(&args.repo.redact_commit_info)?;
    if args.origin_url.as_deref().is_some_and(|u| u.trim().is_empty()) {
        bail!("--origin-url must not be empty");
    }
    let template = args
        .template_file
        .as_deref()
        .map(|path| FileAttachment::read("template_file", path))
        .transpose()
        .context("invalid --template-file")?;

    let rt = runtime()?;
    rt.block_on(async {
        let cancel = CancelSignal::new();
        cancel.cancel_on_ctrl_c();
        let ledger = ctx.ledger(cancel)?;

        let commits = match &git {
            Some(git) => {
                let resolver = CommitRangeResolver::new(git, &ledger, ctx.config.max_commits());
                CommitAttachment::Commit(resolver.resolve_commit(args.commit.as_deref(), false)?)
            }
            None => CommitAttachment::None,
        };

        let kind = EventKind::Trail {
            name: name.clone(),
            description: args.description.clone(),
            origin_url: args.origin_url.clone(),
        };
        let target = EventTarget {
            flow: Some(flow),
            environment: None,
        };
        let mut inputs = EventInputs::new(kind, target);
        inputs.commits = commits;
        inputs.redaction = redaction;
        annotate(&mut inputs, args.annotations.clone());

        let event = EvidencePayloadBuilder::new(&FileFingerprinter).build(inputs)?;
        let delivered = deliver_with(&ledger, &event, template, ctx.verbosity).await?;
        if let Some(verb) = delivered.verb("begun") {
            output::print(format!("trail '{}' was {}", name, verb), ctx.verbosity);
        }
        Ok::<(), anyhow::Error>(())
    })
}
