//! End-to-end orchestrator runs against in-memory fakes.

mod common;

use common::{init_logging, FakeDestination, FakeSource};
use remsync_core::{SyncConfig, TransportError};
use remsync_sync::{
    pipeline::{self, Orchestrator, SyncState},
    reconcile, ReviewOutcome, StatusClass, SyncError,
};
use serde_json::json;

fn config(batch_size: usize) -> SyncConfig {
    SyncConfig {
        batch_size,
        ..SyncConfig::default()
    }
}

fn seven_sources() -> FakeSource {
    FakeSource::with((0..7).map(|i| json!({"id": format!("p{i}"), "v": i})).collect())
}

#[test]
fn full_run_applies_plan_and_requests_review() {
    init_logging();
    let source = FakeSource::with(vec![
        json!({"id": "beta", "v": 2}),
        json!({"id": "release", "v": 1}),
    ]);
    let destination = FakeDestination::with(vec![
        json!({"id": "beta", "v": 1, "last_modified": 10}),
        json!({"id": "nightly", "v": 9}),
    ]);

    let report = pipeline::run(&config(25), &source, &destination).expect("run");

    assert!(report.succeeded());
    assert_eq!(report.plan.total(), 3);
    assert_eq!(report.applied, 3);
    assert_eq!(report.batches.len(), 1);
    assert_eq!(report.batches[0].status, StatusClass::Success);
    assert_eq!(report.review, ReviewOutcome::Requested);
    assert_eq!(*destination.reviews.borrow(), vec!["r?".to_string()]);
    assert_eq!(
        report.states,
        vec![
            SyncState::Init,
            SyncState::SourceFetched,
            SyncState::DestinationFetched,
            SyncState::Diffed,
            SyncState::Batched,
            SyncState::Submitting,
            SyncState::ReviewRequested,
            SyncState::Done,
        ]
    );

    let expected = source_set(&source);
    assert_eq!(destination.snapshot(), expected);
}

#[test]
fn second_run_is_a_no_op() {
    init_logging();
    let source = seven_sources();
    let destination = FakeDestination::with(vec![]);

    pipeline::run(&config(3), &source, &destination).expect("first run");
    destination.reviews.borrow_mut().clear();
    destination.submitted.borrow_mut().clear();

    let report = pipeline::run(&config(3), &source, &destination).expect("second run");
    assert!(report.in_sync());
    assert!(report.succeeded());
    assert_eq!(report.review, ReviewOutcome::NotNeeded);
    assert!(!destination.wrote_anything());
    assert!(destination.reviews.borrow().is_empty());
    assert!(!report.states.contains(&SyncState::Submitting));
}

#[test]
fn identical_sets_request_no_review() {
    let source = FakeSource::with(vec![json!({"id": "esr", "v": 5})]);
    let destination = FakeDestination::with(vec![json!({"id": "esr", "v": 5})]);

    let report = pipeline::run(&config(25), &source, &destination).expect("run");
    assert!(report.batches.is_empty());
    assert_eq!(report.applied, 0);
    assert_eq!(report.review, ReviewOutcome::NotNeeded);
    assert!(destination.reviews.borrow().is_empty());
}

#[test]
fn failed_batch_does_not_stop_later_batches() {
    init_logging();
    let source = seven_sources();
    let mut destination = FakeDestination::with(vec![]);
    destination.failing_batches = vec![(1, TransportError::http(503, "unavailable"))];

    let report = pipeline::run(&config(3), &source, &destination).expect("run");

    assert_eq!(*destination.submitted.borrow(), vec![0, 1, 2]);
    assert!(!report.succeeded());
    assert_eq!(report.applied, 4);
    let statuses: Vec<StatusClass> = report.batches.iter().map(|b| b.status).collect();
    assert_eq!(
        statuses,
        vec![StatusClass::Success, StatusClass::ServerError, StatusClass::Success]
    );
    let failed: Vec<_> = report.failed_batches().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].first_id.as_str(), "p3");
    assert_eq!(failed[0].last_id.as_str(), "p5");
    assert!(failed[0].error.as_deref().unwrap_or("").contains("HTTP 503"));
    assert_eq!(report.review, ReviewOutcome::Requested, "some batches applied");
}

#[test]
fn review_is_skipped_when_every_batch_fails() {
    let source = FakeSource::with(vec![json!({"id": "a"}), json!({"id": "b"})]);
    let mut destination = FakeDestination::with(vec![]);
    destination.failing_batches = vec![
        (0, TransportError::new("connection reset")),
        (1, TransportError::http(400, "bad request")),
    ];

    let report = pipeline::run(&config(1), &source, &destination).expect("run");
    assert_eq!(report.applied, 0);
    assert_eq!(report.review, ReviewOutcome::Skipped);
    assert!(destination.reviews.borrow().is_empty());
    assert_eq!(report.batches[0].status, StatusClass::Transport);
    assert_eq!(report.batches[1].status, StatusClass::ClientError);
    assert!(!report.states.contains(&SyncState::ReviewRequested));
}

#[test]
fn source_failure_is_fatal_and_writes_nothing() {
    let source = FakeSource::failing("clone failed");
    let destination = FakeDestination::with(vec![json!({"id": "a"})]);

    let cfg = config(25);
    let mut orchestrator = Orchestrator::new(&cfg, &source, &destination);
    let err = orchestrator.run().unwrap_err();

    assert!(matches!(err, SyncError::SourceUnavailable { .. }), "got: {err}");
    assert!(err.to_string().contains("fake-source"));
    assert_eq!(orchestrator.state(), SyncState::Failed);
    assert!(!destination.wrote_anything());
}

#[test]
fn destination_failure_is_fatal() {
    let source = FakeSource::with(vec![json!({"id": "a"})]);
    let mut destination = FakeDestination::with(vec![]);
    destination.fetch_error = Some(TransportError::http(401, "unauthorized"));

    let err = pipeline::run(&config(25), &source, &destination).unwrap_err();
    assert!(matches!(err, SyncError::DestinationUnavailable(ref e) if e.status == Some(401)));
    assert!(!destination.wrote_anything());
}

#[test]
fn duplicate_source_identity_is_fatal() {
    let source = FakeSource::with(vec![json!({"id": "a", "v": 1}), json!({"id": "a", "v": 2})]);
    let destination = FakeDestination::with(vec![]);

    let err = pipeline::run(&config(25), &source, &destination).unwrap_err();
    assert!(
        matches!(err, SyncError::DuplicateIdentity { side: "source", .. }),
        "got: {err}"
    );
    assert!(!destination.wrote_anything());
}

#[test]
fn zero_batch_size_fails_before_fetching() {
    let source = FakeSource::failing("must not be called");
    let destination = FakeDestination::with(vec![]);

    let err = pipeline::run(&config(0), &source, &destination).unwrap_err();
    assert!(matches!(err, SyncError::InvalidConfiguration(_)), "got: {err}");
}

#[test]
fn dry_run_plans_without_writing() {
    let source = seven_sources();
    let destination = FakeDestination::with(vec![]);
    let cfg = SyncConfig {
        dry_run: true,
        ..config(3)
    };

    let report = pipeline::run(&cfg, &source, &destination).expect("run");
    assert!(report.dry_run);
    assert!(report.succeeded());
    assert_eq!(report.applied, 0);
    let sizes: Vec<usize> = report.batches.iter().map(|b| b.size).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
    assert!(report.batches.iter().all(|b| b.status == StatusClass::Planned));
    assert_eq!(report.review, ReviewOutcome::Skipped);
    assert!(!destination.wrote_anything());
    assert!(destination.reviews.borrow().is_empty());
}

#[test]
fn review_failure_keeps_applied_writes() {
    let source = FakeSource::with(vec![json!({"id": "release", "v": 2})]);
    let mut destination = FakeDestination::with(vec![json!({"id": "release", "v": 1})]);
    destination.review_error = Some(TransportError::http(403, "not a reviewer"));

    let report = pipeline::run(&config(25), &source, &destination).expect("run");
    assert!(!report.succeeded());
    assert_eq!(report.applied, 1);
    assert!(matches!(report.review, ReviewOutcome::Failed(ref msg) if msg.contains("403")));
    assert_eq!(destination.snapshot(), source_set(&source));
}

#[test]
fn self_approval_on_dev() {
    let source = FakeSource::with(vec![json!({"id": "release", "v": 2})]);
    let destination = FakeDestination::with(vec![]);
    let cfg = SyncConfig {
        self_approve: true,
        ..config(25)
    };

    let report = pipeline::run(&cfg, &source, &destination).expect("run");
    assert_eq!(report.review, ReviewOutcome::Approved);
    assert_eq!(*destination.approvals.borrow(), 1);
}

#[test]
fn fingerprint_matches_between_dry_run_and_real_run() {
    let source = seven_sources();
    let destination = FakeDestination::with(vec![]);
    let dry = SyncConfig {
        dry_run: true,
        ..config(3)
    };

    let planned = pipeline::run(&dry, &source, &destination).expect("dry run");
    let applied = pipeline::run(&config(3), &source, &destination).expect("real run");
    assert_eq!(planned.fingerprint, applied.fingerprint);

    let after = reconcile(&source_set(&source), &destination.snapshot());
    assert!(after.is_empty());
}

fn source_set(source: &FakeSource) -> remsync_core::RecordSet {
    remsync_core::RecordSet::from_records(source.records.clone().expect("records"))
        .expect("source set")
}
