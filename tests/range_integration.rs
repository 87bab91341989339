//! Integration tests for commit range resolution against real repositories.
//!
//! The ledger side is played by [`MockLedger`]; git is real.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use trailmark::core::commit::BoundarySource;
use trailmark::core::range::{BoundaryRequest, CommitRangeResolver, RangeError};
use trailmark::core::redact::{self, RedactionPolicy};
use trailmark::core::types::{Oid, ResourceName};
use trailmark::git::Git;
use trailmark::ledger::mock::MockLedger;
use trailmark::ledger::{DeliveryError, LedgerError, LookupKey};

/// A repository with a linear history C1..Cn on main.
struct TestRepo {
    dir: TempDir,
    commits: Vec<Oid>,
}

impl TestRepo {
    fn linear(n: usize) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "-b", "main"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);

        let mut repo = Self {
            dir,
            commits: Vec::new(),
        };
        for i in 1..=n {
            repo.commit(&format!("C{i}"));
        }
        repo
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn git(&self) -> Git {
        Git::open(self.path()).expect("failed to open test repo")
    }

    fn commit(&mut self, message: &str) -> Oid {
        let file = format!("{}.txt", message.to_lowercase());
        std::fs::write(self.path().join(&file), message).unwrap();
        run_git(self.path(), &["add", &file]);
        run_git(self.path(), &["commit", "-m", message]);
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(self.path())
            .output()
            .unwrap();
        let oid = Oid::new(String::from_utf8(output.stdout).unwrap().trim()).unwrap();
        self.commits.push(oid.clone());
        oid
    }

    /// Commit `Cn` (1-based).
    fn c(&self, n: usize) -> Oid {
        self.commits[n - 1].clone()
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

fn staging() -> LookupKey {
    LookupKey {
        org: ResourceName::new("acme").unwrap(),
        flow: ResourceName::new("backend").unwrap(),
        environment: ResourceName::new("staging").unwrap(),
    }
}

#[tokio::test]
async fn explicit_bounds_exclude_oldest_include_newest() {
    let repo = TestRepo::linear(5);
    let git = repo.git();
    let ledger = MockLedger::new();
    let resolver = CommitRangeResolver::new(&git, &ledger, 1000);

    let range = resolver
        .resolve(&BoundaryRequest::explicit(repo.c(2).as_str(), "HEAD"))
        .await
        .unwrap();

    assert_eq!(range.oldest, repo.c(2));
    assert_eq!(range.newest, repo.c(5));
    assert_eq!(
        range.ids().cloned().collect::<Vec<_>>(),
        vec![repo.c(3), repo.c(4), repo.c(5)]
    );
    assert_eq!(range.oldest_source, BoundarySource::Explicit);
    assert!(range.truncation.is_none());
    assert!(ledger.lookups().is_empty());
}

#[tokio::test]
async fn relative_expressions_resolve() {
    let repo = TestRepo::linear(5);
    let git = repo.git();
    let ledger = MockLedger::new();
    let resolver = CommitRangeResolver::new(&git, &ledger, 1000);

    let range = resolver
        .resolve(&BoundaryRequest::explicit("HEAD~3", "HEAD~1"))
        .await
        .unwrap();

    assert_eq!(
        range.ids().cloned().collect::<Vec<_>>(),
        vec![repo.c(3), repo.c(4)]
    );
}

#[tokio::test]
async fn equal_bounds_give_empty_range() {
    let repo = TestRepo::linear(3);
    let git = repo.git();
    let ledger = MockLedger::new();
    let resolver = CommitRangeResolver::new(&git, &ledger, 1000);

    let range = resolver
        .resolve(&BoundaryRequest::explicit("HEAD", repo.c(3).as_str()))
        .await
        .unwrap();

    assert!(range.is_empty());
    assert_eq!(range.oldest, range.newest);
}

#[tokio::test]
async fn no_oldest_and_no_environment_is_missing_boundary() {
    let repo = TestRepo::linear(2);
    let git = repo.git();
    let ledger = MockLedger::new();
    let resolver = CommitRangeResolver::new(&git, &ledger, 1000);

    let request = BoundaryRequest {
        newest: Some("HEAD".into()),
        ..BoundaryRequest::default()
    };
    let err = resolver.resolve(&request).await.unwrap_err();

    assert!(matches!(err, RangeError::MissingBoundary { environment: None }));
    assert!(ledger.lookups().is_empty());
}

#[tokio::test]
async fn oldest_inferred_from_ledger() {
    let repo = TestRepo::linear(5);
    let git = repo.git();
    let ledger = MockLedger::new().with_commit(staging(), repo.c(3));
    let resolver = CommitRangeResolver::new(&git, &ledger, 1000);

    let range = resolver
        .resolve(&BoundaryRequest::inferred(staging(), None))
        .await
        .unwrap();

    assert_eq!(range.oldest_source, BoundarySource::Ledger);
    assert_eq!(
        range.ids().cloned().collect::<Vec<_>>(),
        vec![repo.c(4), repo.c(5)]
    );
    assert_eq!(ledger.lookups(), vec![staging()]);
}

#[tokio::test]
async fn explicit_oldest_wins_over_inference() {
    let repo = TestRepo::linear(5);
    let git = repo.git();
    let ledger = MockLedger::new().with_commit(staging(), repo.c(3));
    let resolver = CommitRangeResolver::new(&git, &ledger, 1000);

    let mut request = BoundaryRequest::inferred(staging(), Some("HEAD".into()));
    request.oldest = Some(repo.c(1).to_string());
    let range = resolver.resolve(&request).await.unwrap();

    assert_eq!(range.len(), 4);
    assert!(ledger.lookups().is_empty());
}

#[tokio::test]
async fn nothing_reported_for_environment() {
    let repo = TestRepo::linear(2);
    let git = repo.git();
    let ledger = MockLedger::new();
    let resolver = CommitRangeResolver::new(&git, &ledger, 1000);

    let err = resolver
        .resolve(&BoundaryRequest::inferred(staging(), None))
        .await
        .unwrap_err();

    match err {
        RangeError::MissingBoundary {
            environment: Some(env),
        } => assert_eq!(env, "staging"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn ledger_failure_is_propagated() {
    let repo = TestRepo::linear(2);
    let git = repo.git();
    let ledger = MockLedger::new().fail_with(LedgerError::Delivery(DeliveryError::Exhausted {
        attempts: 4,
        status: Some(503),
        last_error: "service unavailable".into(),
    }));
    let resolver = CommitRangeResolver::new(&git, &ledger, 1000);

    let err = resolver
        .resolve(&BoundaryRequest::inferred(staging(), None))
        .await
        .unwrap_err();
    assert!(matches!(err, RangeError::Ledger(_)));
}

#[tokio::test]
async fn diverged_branches_are_disjoint() {
    let mut repo = TestRepo::linear(2);
    run_git(repo.path(), &["checkout", "-b", "side"]);
    let side = repo.commit("Side");
    run_git(repo.path(), &["checkout", "main"]);
    repo.commit("C3");
    let git = repo.git();
    let ledger = MockLedger::new();
    let resolver = CommitRangeResolver::new(&git, &ledger, 1000);

    let err = resolver
        .resolve(&BoundaryRequest::explicit(side.as_str(), "main"))
        .await
        .unwrap_err();
    assert!(matches!(err, RangeError::DisjointHistory { .. }));
}

#[tokio::test]
async fn unknown_revision_is_reported_with_expression() {
    let repo = TestRepo::linear(2);
    let git = repo.git();
    let ledger = MockLedger::new();
    let resolver = CommitRangeResolver::new(&git, &ledger, 1000);

    let err = resolver
        .resolve(&BoundaryRequest::explicit("v9.9.9", "HEAD"))
        .await
        .unwrap_err();
    match err {
        RangeError::UnknownRevision { expr } => assert_eq!(expr, "v9.9.9"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn ledger_commit_missing_locally_is_unknown_revision() {
    let repo = TestRepo::linear(3);
    let git = repo.git();
    let unfetched = Oid::new("ab".repeat(20)).unwrap();
    let ledger = MockLedger::new().with_commit(staging(), unfetched.clone());
    let resolver = CommitRangeResolver::new(&git, &ledger, 1000);

    let err = resolver
        .resolve(&BoundaryRequest::inferred(staging(), None))
        .await
        .unwrap_err();
    match err {
        RangeError::UnknownRevision { expr } => assert_eq!(expr, unfetched.as_str()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn long_ranges_keep_the_newest_commits() {
    let repo = TestRepo::linear(6);
    let git = repo.git();
    let ledger = MockLedger::new();
    let resolver = CommitRangeResolver::new(&git, &ledger, 2);

    let range = resolver
        .resolve(&BoundaryRequest::explicit(repo.c(1).as_str(), "HEAD"))
        .await
        .unwrap();

    assert_eq!(
        range.ids().cloned().collect::<Vec<_>>(),
        vec![repo.c(5), repo.c(6)]
    );
    let truncation = range.truncation.unwrap();
    assert_eq!((truncation.total, truncation.kept), (5, 2));
}

#[tokio::test]
async fn redaction_keeps_ids_and_order() {
    let repo = TestRepo::linear(4);
    let git = repo.git();
    let ledger = MockLedger::new();
    let resolver = CommitRangeResolver::new(&git, &ledger, 1000);

    let mut request = BoundaryRequest::explicit(repo.c(1).as_str(), "HEAD");
    request.with_changed_files = true;
    let range = resolver.resolve(&request).await.unwrap();
    let policy = RedactionPolicy::parse(["author", "message", "changed_files"]).unwrap();
    let redacted = redact::apply_to_range(&range, &policy);

    assert_eq!(
        redacted.ids().collect::<Vec<_>>(),
        range.ids().collect::<Vec<_>>()
    );
    let json = serde_json::to_value(&redacted).unwrap();
    let first = &json["commit_list"][0];
    assert_eq!(first["sha1"], repo.c(2).as_str());
    assert_eq!(first["author"], "**REDACTED**");
    assert_eq!(first["author_email"], "**REDACTED**");
    assert_eq!(first["message"], "**REDACTED**");
    assert_eq!(first["changed_files"], "**REDACTED**");
    assert_eq!(first["committer"], "Test User");
    assert_eq!(first["committer_email"], "test@example.com");
}

#[test]
fn outside_a_repository() {
    let dir = TempDir::new().unwrap();
    let err: RangeError = Git::open(dir.path()).unwrap_err().into();
    assert!(matches!(err, RangeError::NotAGitRepository { .. }));
}
