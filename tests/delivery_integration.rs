//! Integration tests for delivery over HTTP.
//!
//! A wiremock server stands in for the ledger so retries, status handling,
//! authentication and dry-run behavior are observed on the wire.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use trailmark::core::fingerprint::FileFingerprinter;
use trailmark::core::payload::{
    EventInputs, EventKind, EventTarget, EvidenceEvent, EvidencePayloadBuilder,
};
use trailmark::core::types::{Oid, ResourceName};
use trailmark::ledger::{
    Auth, CancelSignal, DeliveryClient, DeliveryError, DeliveryOutcome, FileAttachment,
    HttpTransport, LedgerApi, LedgerLookup, LookupKey, RetryPolicy,
};

const TRAIL_PATH: &str = "/api/v2/trails/acme/backend";

fn name(s: &str) -> ResourceName {
    ResourceName::new(s).unwrap()
}

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        backoff: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
    }
}

fn api(server: &MockServer, auth: Auth, policy: RetryPolicy) -> LedgerApi<HttpTransport> {
    let client = DeliveryClient::new(HttpTransport::new(policy.timeout).unwrap(), auth, policy);
    LedgerApi::new(&server.uri(), name("acme"), client).unwrap()
}

fn dry_run_api(server: &MockServer) -> LedgerApi<HttpTransport> {
    let client =
        DeliveryClient::new(HttpTransport::new(Duration::from_secs(5)).unwrap(), Auth::None, policy(3))
            .with_dry_run(true);
    LedgerApi::new(&server.uri(), name("acme"), client).unwrap()
}

fn trail_event() -> EvidenceEvent {
    let kind = EventKind::Trail {
        name: name("pr-42"),
        description: Some("checkout rework".into()),
        origin_url: None,
    };
    let target = EventTarget {
        flow: Some(name("backend")),
        environment: None,
    };
    EvidencePayloadBuilder::new(&FileFingerprinter)
        .build(EventInputs::new(kind, target))
        .unwrap()
}

fn staging() -> LookupKey {
    LookupKey {
        org: name("acme"),
        flow: name("backend"),
        environment: name("staging"),
    }
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn created_on_201_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(TRAIL_PATH))
        .and(header("authorization", "Bearer s3cret"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({"name": "pr-42", "description": "checkout rework"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = api(&server, Auth::bearer("s3cret"), policy(3))
        .send_event(&trail_event())
        .await
        .unwrap();

    match outcome {
        DeliveryOutcome::Created(response) => {
            assert_eq!(response.status, 201);
            assert_eq!(response.attempts, 1);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn updated_on_200_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(TRAIL_PATH))
        .and(header("authorization", "Basic Y2k6c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = api(&server, Auth::basic("ci", "secret"), policy(3))
        .send_event(&trail_event())
        .await
        .unwrap();

    assert!(matches!(outcome, DeliveryOutcome::Updated(_)));
}

#[tokio::test]
async fn server_errors_are_retried_until_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(TRAIL_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(3)
        .mount(&server)
        .await;

    let err = api(&server, Auth::bearer("t"), policy(2))
        .send_event(&trail_event())
        .await
        .unwrap_err();

    match err {
        DeliveryError::Exhausted {
            attempts,
            status,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(status, Some(503));
            assert!(last_error.contains("maintenance"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn transient_failure_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(TRAIL_PATH))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(TRAIL_PATH))
        .respond_with(ResponseTemplate::new(201))
        .with_priority(2)
        .mount(&server)
        .await;

    let outcome = api(&server, Auth::bearer("t"), policy(3))
        .send_event(&trail_event())
        .await
        .unwrap();

    match outcome {
        DeliveryOutcome::Created(response) => assert_eq!(response.attempts, 3),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(TRAIL_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&server)
        .await;

    let err = api(&server, Auth::bearer("t"), policy(5))
        .send_event(&trail_event())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DeliveryError::Rejected {
            status: 403,
            body: "forbidden".into()
        }
    );
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let policy = RetryPolicy {
        max_retries: 1,
        backoff: Duration::from_millis(10),
        timeout: Duration::from_millis(200),
    };
    let err = api(&server, Auth::bearer("t"), policy)
        .send_event(&trail_event())
        .await
        .unwrap_err();

    match err {
        DeliveryError::Exhausted {
            attempts, status, ..
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(status, None);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn template_is_uploaded_as_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(TRAIL_PATH))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let template_path = dir.path().join("flow.yml");
    std::fs::write(&template_path, "version: 1\ntrail:\n  attestations: []\n").unwrap();
    let template = FileAttachment::read("template_file", &template_path).unwrap();

    let outcome = api(&server, Auth::bearer("t"), policy(0))
        .send_event_with(&trail_event(), Some(template))
        .await
        .unwrap();
    assert!(matches!(outcome, DeliveryOutcome::Created(_)));

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("multipart/form-data"), "{content_type}");
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"data_json\""));
    assert!(body.contains("\"name\":\"pr-42\""));
    assert!(body.contains("name=\"template_file\"; filename=\"flow.yml\""));
    assert!(body.contains("attestations: []"));
}

#[tokio::test]
async fn dry_run_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = dry_run_api(&server).send_event(&trail_event()).await.unwrap();

    match outcome {
        DeliveryOutcome::Simulated(request) => {
            assert_eq!(request.url.path(), TRAIL_PATH);
            assert!(request.pretty_body().unwrap().contains("\"pr-42\""));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn cancelled_client_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancelSignal::new();
    cancel.cancel();
    let client = DeliveryClient::new(
        HttpTransport::new(Duration::from_secs(5)).unwrap(),
        Auth::bearer("t"),
        policy(3),
    )
    .with_cancel(cancel);
    let api = LedgerApi::new(&server.uri(), name("acme"), client).unwrap();

    assert_eq!(
        api.send_event(&trail_event()).await.unwrap_err(),
        DeliveryError::Cancelled
    );
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn lookup_returns_last_reported_commit() {
    let sha = "3".repeat(40);
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/approvals/acme/backend/latest-commit"))
        .and(query_param("environment", "staging"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"commit": sha.clone()})))
        .expect(1)
        .mount(&server)
        .await;

    let commit = api(&server, Auth::bearer("t"), policy(0))
        .last_reported_commit(&staging())
        .await
        .unwrap();

    assert_eq!(commit, Some(Oid::new(sha).unwrap()));
}

#[tokio::test]
async fn lookup_not_found_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let commit = api(&server, Auth::bearer("t"), policy(0))
        .last_reported_commit(&staging())
        .await
        .unwrap();
    assert_eq!(commit, None);
}

#[tokio::test]
async fn lookup_null_commit_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"commit": null})))
        .mount(&server)
        .await;

    let commit = api(&server, Auth::bearer("t"), policy(0))
        .last_reported_commit(&staging())
        .await
        .unwrap();
    assert_eq!(commit, None);
}

#[tokio::test]
async fn lookup_is_sent_even_in_dry_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let commit = dry_run_api(&server)
        .last_reported_commit(&staging())
        .await
        .unwrap();
    assert_eq!(commit, None);
}
