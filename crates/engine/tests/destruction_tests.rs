//! Destruction paths: owner deletes, deferred deadlines, permanence.

mod common;

use common::TestEngine;
use ember_core::share::Identity;
use ember_engine::{AccessOutcome, DeleteOutcome};
use ember_metadata::ShareRepo;
use ember_storage::BlobStore;
use time::{Duration, OffsetDateTime};

#[tokio::test]
async fn test_owner_delete_destroys_record_and_blob() {
    let harness = TestEngine::new().await;
    let now = OffsetDateTime::now_utc();
    let request = harness.seed_request("owner@x.com").await;
    let content_ref = request.content_ref.clone();
    let created = harness.engine.create_share(request, now).await.unwrap();
    let id = created.record.id;

    // A non-owner cannot delete.
    let outcome = harness
        .engine
        .request_delete(id, &Identity::known("intruder@x.com"))
        .await
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::Blocked);
    let outcome = harness
        .engine
        .request_delete(id, &Identity::Anonymous)
        .await
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::Blocked);

    // The owner can; record and blob are both gone afterward.
    let outcome = harness
        .engine
        .request_delete(id, &Identity::known("OWNER@X.COM"))
        .await
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(harness.shares.get_share(id).await.unwrap().is_none());
    assert!(!harness.blobs.exists(&content_ref).await.unwrap());

    // A second delete is a no-op, not an error.
    let outcome = harness
        .engine
        .request_delete(id, &Identity::known("owner@x.com"))
        .await
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::NotFound);
}

#[tokio::test]
async fn test_destruction_is_permanent() {
    let harness = TestEngine::new().await;
    let now = OffsetDateTime::now_utc();
    let request = harness.seed_request("owner@x.com").await;
    let created = harness.engine.create_share(request, now).await.unwrap();
    let id = created.record.id;

    harness
        .engine
        .request_delete(id, &Identity::known("owner@x.com"))
        .await
        .unwrap();

    // Every subsequent access converges on the same terminal answer.
    for _ in 0..3 {
        let outcome = harness
            .engine
            .request_access(id, &Identity::known("owner@x.com"), now)
            .await
            .unwrap();
        assert!(matches!(outcome, AccessOutcome::NotFound));
    }
}

#[tokio::test]
async fn test_deferred_destruction_fires_at_due_time() {
    let harness = TestEngine::new().await;
    let now = OffsetDateTime::now_utc();
    let mut request = harness.seed_request("owner@x.com").await;
    request.self_destruct_after_secs = Some(10);
    let content_ref = request.content_ref.clone();
    let created = harness.engine.create_share(request, now).await.unwrap();
    let id = created.record.id;

    // The countdown arms at the first grant, not at upload.
    let record = harness.shares.get_share(id).await.unwrap().unwrap();
    assert!(record.destruct_due_at.is_none());

    let first_view = now + Duration::minutes(5);
    let outcome = harness
        .engine
        .request_access(id, &Identity::Anonymous, first_view)
        .await
        .unwrap();
    let grant = match outcome {
        AccessOutcome::Granted(grant) => grant,
        other => panic!("expected grant, got {other:?}"),
    };
    assert_eq!(
        grant.record.destruct_due_at,
        Some(first_view + Duration::seconds(10))
    );

    // Before the deadline other viewers still get in.
    let outcome = harness
        .engine
        .request_access(id, &Identity::Anonymous, first_view + Duration::seconds(9))
        .await
        .unwrap();
    assert!(matches!(outcome, AccessOutcome::Granted(_)));

    // At the deadline the record reads as consumed, and observing it
    // destroys the physical state.
    let outcome = harness
        .engine
        .request_access(id, &Identity::Anonymous, first_view + Duration::seconds(10))
        .await
        .unwrap();
    assert!(matches!(outcome, AccessOutcome::AlreadyConsumed));
    assert!(harness.shares.get_share(id).await.unwrap().is_none());
    assert!(!harness.blobs.exists(&content_ref).await.unwrap());

    // Once destroyed, later requests see NotFound.
    let outcome = harness
        .engine
        .request_access(id, &Identity::Anonymous, first_view + Duration::seconds(11))
        .await
        .unwrap();
    assert!(matches!(outcome, AccessOutcome::NotFound));
}

#[tokio::test]
async fn test_one_time_grant_survives_its_own_destruction() {
    let harness = TestEngine::new().await;
    let now = OffsetDateTime::now_utc();
    let mut request = harness.seed_request("owner@x.com").await;
    request.self_destruct_on_view = true;
    let created = harness.engine.create_share(request, now).await.unwrap();
    let id = created.record.id;

    let outcome = harness
        .engine
        .request_access(id, &Identity::Anonymous, now)
        .await
        .unwrap();
    let grant = match outcome {
        AccessOutcome::Granted(grant) => grant,
        other => panic!("expected grant, got {other:?}"),
    };
    // Content was produced before destruction proceeded.
    assert_eq!(grant.content.as_ref(), b"the secret payload");
    // And the share is already gone.
    assert!(harness.shares.get_share(id).await.unwrap().is_none());
    assert!(!harness.blobs.exists(&grant.handle.content_ref).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_one_time_access_grants_exactly_once() {
    let harness = TestEngine::new().await;
    let now = OffsetDateTime::now_utc();
    let mut request = harness.seed_request("owner@x.com").await;
    request.self_destruct_on_view = true;
    let created = harness.engine.create_share(request, now).await.unwrap();
    let id = created.record.id;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = harness.engine.clone();
        handles.push(tokio::spawn(async move {
            engine.request_access(id, &Identity::Anonymous, now).await
        }));
    }

    let mut granted = 0;
    let mut terminal = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            AccessOutcome::Granted(grant) => {
                granted += 1;
                assert_eq!(grant.content.as_ref(), b"the secret payload");
            }
            // Losers see the link as consumed, or as gone once the
            // winner's destruction lands. Both are terminal and honest.
            AccessOutcome::AlreadyConsumed | AccessOutcome::NotFound => terminal += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(granted, 1, "one-time link granted more than once");
    assert_eq!(terminal, 7);
}
