//! approval command - Report or request an approval over a commit range

use anyhow::{Context as _, Result};

use super::{announce_range, annotate, deliver};
use crate::cli::args::ApprovalArgs;
use crate::cli::context::{open_repo, runtime, Context, Globals};
use crate::core::fingerprint::{ArtifactIdentity, FileFingerprinter};
use crate::core::payload::{
    CommitAttachment, EventInputs, EventKind, EventTarget, EvidencePayloadBuilder,
};
use crate::core::range::{BoundaryRequest, CommitRangeResolver};
use crate::core::types::ResourceName;
use crate::ledger::{CancelSignal, LookupKey};
use crate::ui::output;

/// Report an approval, or request one when `approved` is false.
pub fn approval(globals: Globals, args: ApprovalArgs, approved: bool) -> Result<()> {
    let git = open_repo(&args.repo.repo_root)?;
    let ctx = Context::load(globals, Some(git.git_dir()))?;
    let flow = ctx.flow(args.flow.as_deref())?;
    let environment = args
        .environment
        .as_deref()
        .map(ResourceName::new)
        .transpose()
        .context("invalid --environment")?;
    let redaction = ctx.redaction(&args.repo.redact_commit_info)?;

    let rt = runtime()?;
    rt.block_on(async {
        let cancel = CancelSignal::new();
        cancel.cancel_on_ctrl_c();
        let ledger = ctx.ledger(cancel)?;

        let request = BoundaryRequest {
            oldest: args.oldest_commit.clone(),
            newest: Some(args.newest_commit.clone()),
            inference: environment.clone().map(|environment| LookupKey {
                org: ledger.org().clone(),
                flow: flow.clone(),
                environment,
            }),
            with_changed_files: true,
        };
        let resolver = CommitRangeResolver::new(&git, &ledger, ctx.config.max_commits());
        let range = resolver.resolve(&request).await?;
        announce_range(&range, ctx.verbosity);

        let kind = EventKind::Approval {
            approved,
            approver: args.approver.clone(),
            description: args.description.clone(),
        };
        let target = EventTarget {
            flow: Some(flow),
            environment,
        };
        let mut inputs = EventInputs::new(kind, target);
        inputs.artifact = Some(ArtifactIdentity {
            fingerprint: args.artifact.fingerprint.clone(),
            artifact_type: args.artifact.artifact_type.clone(),
            name: args.artifact.artifact.clone(),
        });
        inputs.commits = CommitAttachment::Range(range);
        inputs.redaction = redaction;
        annotate(&mut inputs, args.annotations.clone());

        let event = EvidencePayloadBuilder::new(&FileFingerprinter).build(inputs)?;
        let delivered = deliver(&ledger, &event, ctx.verbosity).await?;

        if let (Some(verb), Some(fingerprint)) =
            (delivered.verb("created"), event.artifact_fingerprint.as_ref())
        {
            output::print(
                format!("{} {} for artifact: {}", event.kind.label(), verb, fingerprint),
                ctx.verbosity,
            );
        }
        Ok::<(), anyhow::Error>(())
    })
}
