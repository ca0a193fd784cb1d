//! End-to-end checkout scenarios against the in-memory depot.

use std::path::Path;
use std::sync::Arc;

use depotsync_core::{
    Checkout, CheckoutConfig, CheckoutOutcome, MemoryBuild, NoChangelog, NodeIdentity,
    RevisionMarker, RevisionSink,
};
use depotsync_core::{BuildLog, BuildRecord};
use depotsync_remote::fakes::MemoryDepot;

fn config() -> CheckoutConfig {
    CheckoutConfig {
        port: "depot.example.com:1666".to_string(),
        user: "builder".to_string(),
        credential: "s3cret".to_string(),
        client: "ci-ws".to_string(),
        stream: "//streams/main".to_string(),
    }
}

fn seeded_depot() -> Arc<MemoryDepot> {
    Arc::new(MemoryDepot::new().with_credentials("builder", "s3cret"))
}

async fn run_checkout(
    depot: &Arc<MemoryDepot>,
    config: CheckoutConfig,
    node: NodeIdentity,
    root: &Path,
    history: Option<&dyn BuildRecord>,
    build: &mut MemoryBuild,
) -> (CheckoutOutcome, String) {
    let checkout = Checkout::new(config, node, depot.clone());
    let mut log = BuildLog::new(Vec::new());
    let outcome = checkout
        .run(root, history, build, &mut NoChangelog, &mut log)
        .await;
    (outcome, String::from_utf8(log.into_inner()).unwrap())
}

#[tokio::test]
async fn fresh_job_syncs_to_head_and_records_it() {
    let depot = seeded_depot();
    depot.push_change(101, "dev", "first");
    depot.push_change(102, "dev", "second");
    depot.push_change(103, "dev", "third");
    depot.seed_files(&["//depot/src/main.c", "//depot/src/util.c"]);

    let root = tempfile::tempdir().unwrap();
    let mut build = MemoryBuild::first();
    let (outcome, log) = run_checkout(
        &depot,
        config(),
        NodeIdentity::controller(),
        root.path(),
        None,
        &mut build,
    )
    .await;

    match outcome {
        CheckoutOutcome::Success {
            revision,
            synced_files,
        } => {
            assert_eq!(revision, RevisionMarker::Change(103));
            assert_eq!(synced_files, 2);
        }
        other => panic!("expected success, got {other:?}"),
    }

    assert!(log.contains("no previous builds"));
    assert!(log.contains("Syncing to changelist:........103"));
    assert_eq!(build.marker(), Some(RevisionMarker::Change(103)));

    // A fresh job reports every visible change, newest first.
    let tail = log.split("Calculating changelog...").nth(1).unwrap();
    let ids: Vec<&str> = tail.split_whitespace().collect();
    assert_eq!(ids, vec!["103", "102", "101"]);
}

#[tokio::test]
async fn incremental_build_reports_only_the_new_range() {
    let depot = seeded_depot();
    for id in 100..=107 {
        depot.push_change(id, "dev", "change");
    }
    depot.seed_files(&["//depot/src/main.c"]);

    let mut previous = MemoryBuild::first();
    previous.attach_revision(RevisionMarker::Change(103));

    let root = tempfile::tempdir().unwrap();
    let mut build = MemoryBuild::first();
    let (outcome, log) = run_checkout(
        &depot,
        config(),
        NodeIdentity::controller(),
        root.path(),
        Some(&previous),
        &mut build,
    )
    .await;

    assert!(outcome.succeeded());
    assert_eq!(build.marker(), Some(RevisionMarker::Change(107)));
    assert!(log.contains("Last built changelist:........103"));

    let tail = log.split("Calculating changelog...").nth(1).unwrap();
    let ids: Vec<&str> = tail.split_whitespace().collect();
    assert_eq!(ids, vec!["107", "106", "105", "104"]);
}

#[tokio::test]
async fn missing_credential_fails_before_any_remote_call() {
    let depot = seeded_depot();
    let mut broken = config();
    broken.credential = String::new();

    let root = tempfile::tempdir().unwrap();
    let mut build = MemoryBuild::first();
    let (outcome, log) = run_checkout(
        &depot,
        broken,
        NodeIdentity::controller(),
        root.path(),
        None,
        &mut build,
    )
    .await;

    match outcome {
        CheckoutOutcome::Failed { stage, .. } => assert_eq!(stage, "configuration"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(log.contains("credential missing"));
    assert_eq!(depot.counters().logins, 0);
    assert!(build.marker().is_none());
}

#[tokio::test]
async fn rejected_credential_fails_at_connect() {
    let depot = seeded_depot();
    let mut wrong = config();
    wrong.credential = "not-it".to_string();

    let root = tempfile::tempdir().unwrap();
    let mut build = MemoryBuild::first();
    let (outcome, _log) = run_checkout(
        &depot,
        wrong,
        NodeIdentity::controller(),
        root.path(),
        None,
        &mut build,
    )
    .await;

    match outcome {
        CheckoutOutcome::Failed { stage, .. } => assert_eq!(stage, "connect"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(build.marker().is_none());
}

#[tokio::test]
async fn sync_failure_records_nothing_and_still_closes_the_session() {
    let depot = seeded_depot();
    depot.push_change(101, "dev", "first");
    depot.seed_files(&["//depot/src/main.c"]);
    depot.fail_sync_with("transport reset mid-transfer");

    let mut previous = MemoryBuild::first();
    previous.attach_revision(RevisionMarker::Change(99));

    let root = tempfile::tempdir().unwrap();
    let mut build = MemoryBuild::first();
    let (outcome, log) = run_checkout(
        &depot,
        config(),
        NodeIdentity::controller(),
        root.path(),
        Some(&previous),
        &mut build,
    )
    .await;

    match &outcome {
        CheckoutOutcome::Failed { stage, message } => {
            assert_eq!(*stage, "sync");
            assert!(message.contains("transport reset"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(log.contains("*** ERROR (sync):"));

    // The workspace was resolved before the sync blew up.
    assert!(depot.workspace("ci-ws").is_some());
    // No marker for a failed sync, so the next build's baseline is intact.
    assert!(build.marker().is_none());
    assert_eq!(
        depotsync_core::last_known(Some(&previous)),
        RevisionMarker::Change(99)
    );
    // The session was released on the failure path.
    assert_eq!(depot.counters().live_sessions, 0);
}

#[tokio::test]
async fn resolve_is_idempotent_for_an_unchanged_spec() {
    let depot = seeded_depot();
    depot.push_change(101, "dev", "first");
    depot.seed_files(&["//depot/src/main.c"]);

    let root = tempfile::tempdir().unwrap();
    for _ in 0..2 {
        let mut build = MemoryBuild::first();
        let (outcome, _) = run_checkout(
            &depot,
            config(),
            NodeIdentity::controller(),
            root.path(),
            None,
            &mut build,
        )
        .await;
        assert!(outcome.succeeded());
    }

    let counters = depot.counters();
    assert_eq!(counters.workspace_creates, 1);
    assert_eq!(counters.workspace_updates, 0);
}

#[tokio::test]
async fn drifted_record_is_corrected_not_recreated() {
    let depot = seeded_depot();
    depot.push_change(101, "dev", "first");

    // First checkout creates the record under the old root.
    let old_root = tempfile::tempdir().unwrap();
    let mut build = MemoryBuild::first();
    run_checkout(
        &depot,
        config(),
        NodeIdentity::controller(),
        old_root.path(),
        None,
        &mut build,
    )
    .await;

    // The job moves to a new working directory; the record must follow.
    let new_root = tempfile::tempdir().unwrap();
    let mut build = MemoryBuild::first();
    let (outcome, _) = run_checkout(
        &depot,
        config(),
        NodeIdentity::controller(),
        new_root.path(),
        None,
        &mut build,
    )
    .await;
    assert!(outcome.succeeded());

    let counters = depot.counters();
    assert_eq!(counters.workspace_creates, 1);
    assert_eq!(counters.workspace_updates, 1);

    let record = depot.workspace("ci-ws").unwrap();
    assert_eq!(record.root, new_root.path().display().to_string());
}

#[tokio::test]
async fn nodes_never_share_a_workspace_record() {
    let depot = seeded_depot();
    depot.push_change(101, "dev", "first");

    let root = tempfile::tempdir().unwrap();
    for node in ["linux-1", "linux-2"] {
        let mut build = MemoryBuild::first();
        let (outcome, _) = run_checkout(
            &depot,
            config(),
            NodeIdentity::named(node, format!("{node}.fleet.example.com")),
            root.path(),
            None,
            &mut build,
        )
        .await;
        assert!(outcome.succeeded());
    }

    assert!(depot.workspace("ci-ws_linux-1").is_some());
    assert!(depot.workspace("ci-ws_linux-2").is_some());
    assert_eq!(depot.counters().workspace_creates, 2);
}

#[tokio::test]
async fn gap_beyond_the_window_truncates_the_changelog() {
    let depot = seeded_depot();
    // 150 changes since the recorded baseline, window of 10.
    for id in 1..=150 {
        depot.push_change(id, "dev", "change");
    }
    depot.seed_files(&["//depot/src/main.c"]);

    let mut previous = MemoryBuild::first();
    previous.attach_revision(RevisionMarker::Change(1));

    let root = tempfile::tempdir().unwrap();
    let mut build = MemoryBuild::first();
    let checkout = Checkout::new(config(), NodeIdentity::controller(), depot.clone()).with_window(10);
    let mut log = BuildLog::new(Vec::new());
    let outcome = checkout
        .run(
            root.path(),
            Some(&previous),
            &mut build,
            &mut depotsync_core::NoChangelog,
            &mut log,
        )
        .await;
    assert!(outcome.succeeded());

    let log = String::from_utf8(log.into_inner()).unwrap();
    let tail = log.split("Calculating changelog...").nth(1).unwrap();
    let ids: Vec<u64> = tail
        .split_whitespace()
        .map(|s| s.parse().unwrap())
        .collect();

    // Exactly the window, newest first, matching the server's ordering.
    assert_eq!(ids, (141..=150).rev().collect::<Vec<u64>>());
    // Sync still went all the way to head.
    assert_eq!(build.marker(), Some(RevisionMarker::Change(150)));
}

#[tokio::test]
async fn empty_stream_is_a_query_error() {
    let depot = seeded_depot();
    // No changes seeded at all.
    let root = tempfile::tempdir().unwrap();
    let mut build = MemoryBuild::first();
    let (outcome, _) = run_checkout(
        &depot,
        config(),
        NodeIdentity::controller(),
        root.path(),
        None,
        &mut build,
    )
    .await;

    match outcome {
        CheckoutOutcome::Failed { stage, .. } => assert_eq!(stage, "query"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(build.marker().is_none());
    assert_eq!(depot.counters().live_sessions, 0);
}

#[tokio::test]
async fn head_never_moves_backward_over_successive_builds() {
    let depot = seeded_depot();
    depot.push_change(101, "dev", "first");
    depot.seed_files(&["//depot/src/main.c"]);

    let root = tempfile::tempdir().unwrap();
    let mut last_head = RevisionMarker::Unknown;
    for new_id in [102, 103, 104] {
        let mut build = MemoryBuild::first();
        let (outcome, _) = run_checkout(
            &depot,
            config(),
            NodeIdentity::controller(),
            root.path(),
            None,
            &mut build,
        )
        .await;
        assert!(outcome.succeeded());

        let head = build.marker().unwrap();
        assert!(head >= last_head);
        last_head = head;
        depot.push_change(new_id, "dev", "more work");
    }
}
