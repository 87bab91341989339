//! evidence commands - Attach evidence to a commit or an artifact

use anyhow::{Context as _, Result};

use super::{annotate, deliver};
use crate::cli::args::{ArtifactEvidenceArgs, CommitEvidenceArgs};
use crate::cli::context::{open_repo, runtime, Context, Globals};
use crate::core::fingerprint::{ArtifactIdentity, FileFingerprinter};
use crate::core::payload::{
    CommitAttachment, EventInputs, EventKind, EventTarget, EvidencePayloadBuilder,
};
use crate::core::range::CommitRangeResolver;
use crate::core::types::ResourceName;
use crate::ledger::CancelSignal;
use crate::ui::output;

/// Report evidence for a commit in one or more flows.
pub fn commit_evidence(globals: Globals, args: CommitEvidenceArgs) -> Result<()> {
    let git = open_repo(&args.repo.repo_root)?;
    let ctx = Context::load(globals, Some(git.git_dir()))?;
    let name = ResourceName::new(args.name.as_str()).context("invalid --name")?;
    let flows = args
        .flows
        .iter()
        .map(|f| ResourceName::new(f.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .context("invalid --flows")?;
    let redaction = ctx.redaction(&args.repo.redact_commit_info)?;

    let rt = runtime()?;
    rt.block_on(async {
        let cancel = CancelSignal::new();
        cancel.cancel_on_ctrl_c();
        let ledger = ctx.ledger(cancel)?;

        let resolver = CommitRangeResolver::new(&git, &ledger, ctx.config.max_commits());
        let commit = resolver.resolve_commit(args.commit.as_deref(), false)?;

        let kind = EventKind::CommitEvidence {
            name: name.clone(),
            flows,
            build_url: args.build_url.clone(),
            compliant: args.compliant,
            description: args.description.clone(),
        };
        let mut inputs = EventInputs::new(kind, EventTarget::default());
        inputs.commits = CommitAttachment::Commit(commit);
        inputs.redaction = redaction;
        annotate(&mut inputs, args.annotations.clone());

        let event = EvidencePayloadBuilder::new(&FileFingerprinter).build(inputs)?;
        if deliver(&ledger, &event, ctx.verbosity).await?.verb("reported").is_some() {
            if let Some(commit) = &event.commit {
                output::print(
                    format!("commit evidence '{}' reported for commit: {}", name, commit.id),
                    ctx.verbosity,
                );
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}

/// Report evidence for an artifact.
pub fn artifact_evidence(globals: Globals, args: ArtifactEvidenceArgs) -> Result<()> {
    let ctx = Context::load(globals, None)?;
    let flow = ctx.flow(args.flow.as_deref())?;
    let name = ResourceName::new(args.name.as_str()).context("invalid --name")?;

    let rt = runtime()?;
    rt.block_on(async {
        let cancel = CancelSignal::new();
        cancel.cancel_on_ctrl_c();
        let ledger = ctx.ledger(cancel)?;

        let kind = EventKind::ArtifactEvidence {
            name: name.clone(),
            build_url: args.build_url.clone(),
            compliant: args.compliant,
            description: args.description.clone(),
        };
        let target = EventTarget {
            flow: Some(flow),
            environment: None,
        };
        let mut inputs = EventInputs::new(kind, target);
        inputs.artifact = Some(ArtifactIdentity {
            fingerprint: args.artifact.fingerprint.clone(),
            artifact_type: args.artifact.artifact_type.clone(),
            name: args.artifact.artifact.clone(),
        });
        annotate(&mut inputs, args.annotations.clone());

        let event = EvidencePayloadBuilder::new(&FileFingerprinter).build(inputs)?;
        if deliver(&ledger, &event, ctx.verbosity).await?.verb("reported").is_some() {
            if let Some(fingerprint) = &event.artifact_fingerprint {
                output::print(
                    format!("artifact evidence '{}' reported for artifact: {}", name, fingerprint),
                    ctx.verbosity,
                );
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}
