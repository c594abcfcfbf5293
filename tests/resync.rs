//! Background resync: idempotent snapshot rebuilds, bounded staleness
//! after missed patches, overlap skipping, and outcome reporting.

mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use scorta::{ReadSource, ResyncOutcome, ResyncRun, spawn_interval_resync};

use support::{TestEnv, published_article, published_event};

#[tokio::test]
async fn resync_writes_byte_identical_files_for_unchanged_data() {
    let env = TestEnv::new();
    env.primary.seed(vec![
        published_article("Article A", 10),
        published_article("Article B", 20),
        published_event("Event C", 30, 86_400),
    ]);

    let service = env.resync();
    assert_eq!(
        service.force_resync().await.expect("first run"),
        ResyncRun::Completed(3)
    );
    let first = tokio::fs::read(&env.config.snapshot_path).await.expect("read");

    assert_eq!(
        service.force_resync().await.expect("second run"),
        ResyncRun::Completed(3)
    );
    let second = tokio::fs::read(&env.config.snapshot_path).await.expect("read");

    assert_eq!(first, second);
}

#[tokio::test]
async fn resync_reconciles_writes_the_patch_path_missed() {
    let env = TestEnv::new();
    // The snapshot holds one stale item the primary no longer has, and is
    // missing two items that landed at the primary without a patch.
    let stale = published_article("Since deleted", 500);
    env.store.replace(&[stale.clone()]).await.expect("seed snapshot");
    env.primary.seed(vec![
        published_article("Missed one", 5),
        published_article("Missed two", 15),
    ]);

    env.resync().force_resync().await.expect("resync");

    let stored = env.store.load().await;
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|item| item.id != stale.id));

    // The reconciled snapshot now serves degraded reads.
    env.primary.fail_reads.store(true, Ordering::SeqCst);
    let page = env.reader().home_feed().await;
    assert_eq!(page.source, ReadSource::Snapshot);
    assert_eq!(page.items.len(), 2);
}

#[tokio::test]
async fn failed_resync_preserves_snapshot_and_records_the_reason() {
    let env = TestEnv::new();
    env.store
        .replace(&[published_article("Still here", 10)])
        .await
        .expect("seed snapshot");
    env.primary.fail_reads.store(true, Ordering::SeqCst);

    let service = env.resync();
    service.force_resync().await.expect_err("primary down");

    assert_eq!(env.store.load().await.len(), 1);
    match service.last_outcome().expect("outcome recorded") {
        ResyncOutcome::Failed { reason, .. } => {
            assert!(!reason.is_empty());
        }
        other => panic!("expected failure outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn completed_resync_reports_item_count() {
    let env = TestEnv::new();
    env.primary.seed(vec![
        published_article("One", 1),
        published_event("Two", 2, 3_600),
    ]);

    let service = env.resync();
    service.force_resync().await.expect("resync");

    match service.last_outcome().expect("outcome recorded") {
        ResyncOutcome::Completed { items, .. } => assert_eq!(items, 2),
        other => panic!("expected completion outcome, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn overlapping_trigger_is_skipped_not_queued() {
    let env = TestEnv::new();
    env.primary.seed(vec![published_article("Slow", 5)]);
    env.primary.read_delay_ms.store(200, Ordering::SeqCst);

    let service = Arc::new(env.resync());
    let background = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.force_resync().await })
    };

    // Let the background run take the slot before triggering again.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(
        service.force_resync().await.expect("overlap"),
        ResyncRun::Skipped
    );

    let first = background.await.expect("task").expect("resync");
    assert_eq!(first, ResyncRun::Completed(1));

    // With the slot free again the next trigger runs for real.
    assert_eq!(
        service.force_resync().await.expect("rerun"),
        ResyncRun::Completed(1)
    );
}

#[tokio::test(start_paused = true)]
async fn interval_runner_resyncs_on_schedule() {
    let env = TestEnv::new();
    env.primary.seed(vec![published_article("Scheduled", 5)]);

    let service = Arc::new(env.resync());
    let handle = spawn_interval_resync(Arc::clone(&service), Duration::from_secs(300));

    tokio::time::sleep(Duration::from_secs(301)).await;
    // The run crosses a blocking file write; poll briefly for completion.
    for _ in 0..100 {
        if service.last_outcome().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.abort();

    match service.last_outcome().expect("scheduled run recorded") {
        ResyncOutcome::Completed { items, .. } => assert_eq!(items, 1),
        other => panic!("expected completion outcome, got {other:?}"),
    }
    assert_eq!(env.store.load().await.len(), 1);
}
