//! # Administrative Sweep Tests
//!
//! Global pause toggles and OCM client injection requeue every Addon through
//! the bounded requeue queue.
//!
//! These tests verify:
//! - One requeue event per Addon for each pause toggle
//! - A full queue surfaces a timeout instead of blocking
//! - A toggle whose sweep failed is swept again on retry
//! - Only the first OCM client injection sweeps
//! - The AddonOperator reconcile only toggles pause on a change

mod common;

use addon_operator::controller::addon::{PhaseResult, RequeueError};
use addon_operator::controller::addon_operator::sync_pause;
use addon_operator::ocm::OcmClient;
use common::{addon, drain, phase_log, reconciler, FakeOcm, FakeStore, RecordingPhase};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn three_addons() -> Arc<FakeStore> {
    FakeStore::with_addons(["a", "b", "c"].map(|name| addon(name, false, serde_json::json!({}))))
}

#[tokio::test]
async fn test_each_pause_toggle_requeues_every_addon() {
    let log = phase_log();
    let (reconciler, mut rx) = reconciler(
        three_addons(),
        vec![RecordingPhase::boxed("a", PhaseResult::Continue, &log)],
        8,
    );
    assert!(!reconciler.is_paused().await);

    reconciler.enable_global_pause().await.expect("pause");
    assert!(reconciler.is_paused().await);
    assert_eq!(drain(&mut rx), vec!["a", "b", "c"]);

    reconciler.disable_global_pause().await.expect("resume");
    assert!(!reconciler.is_paused().await);
    assert_eq!(drain(&mut rx), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_full_queue_times_out() {
    let log = phase_log();
    let (reconciler, mut rx) = reconciler(
        three_addons(),
        vec![RecordingPhase::boxed("a", PhaseResult::Continue, &log)],
        2,
    );

    let err = reconciler
        .enable_global_pause()
        .await
        .expect_err("queue should be full");

    assert!(matches!(err, RequeueError::Timeout(_)));
    // The flag is set before the sweep; the toggle stays pending until a sweep completes.
    assert!(reconciler.is_paused().await);
    assert!(!reconciler.is_pause_settled(true).await);
    assert_eq!(drain(&mut rx).len(), 2);
}

#[tokio::test]
async fn test_sync_pause_retries_sweep_after_timeout() {
    let log = phase_log();
    let (reconciler, mut rx) = reconciler(
        three_addons(),
        vec![RecordingPhase::boxed("a", PhaseResult::Continue, &log)],
        2,
    );

    let err = sync_pause(&reconciler, true)
        .await
        .expect_err("queue should be full");
    assert!(matches!(err, RequeueError::Timeout(_)));
    assert!(reconciler.is_paused().await);
    assert!(!reconciler.is_pause_settled(true).await);
    assert_eq!(drain(&mut rx), vec!["a", "b"]);

    // The retried sweep needs a consumer to fit three Addons into two slots.
    let consume = async {
        let mut names = Vec::new();
        while names.len() < 3 {
            match rx.try_recv() {
                Some(identity) => names.push(identity.name),
                None => tokio::task::yield_now().await,
            }
        }
        names
    };
    let (retried, names) = tokio::time::timeout(
        Duration::from_secs(5),
        async { tokio::join!(sync_pause(&reconciler, true), consume) },
    )
    .await
    .expect("retried sweep completes");
    assert!(retried.expect("retry"));
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(reconciler.is_pause_settled(true).await);

    assert!(!sync_pause(&reconciler, true).await.expect("settled"));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_list_failure_is_reported() {
    let store = three_addons();
    store.fail_list.store(true, Ordering::SeqCst);
    let log = phase_log();
    let (reconciler, mut rx) = reconciler(
        store,
        vec![RecordingPhase::boxed("a", PhaseResult::Continue, &log)],
        8,
    );

    let err = reconciler
        .enable_global_pause()
        .await
        .expect_err("list failure");

    assert!(matches!(err, RequeueError::List(_)));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_only_first_ocm_injection_sweeps() {
    let log = phase_log();
    let (reconciler, mut rx) = reconciler(
        three_addons(),
        vec![RecordingPhase::boxed("a", PhaseResult::Continue, &log)],
        8,
    );
    assert!(reconciler.ocm_client().await.is_none());

    let first: Arc<dyn OcmClient> = Arc::new(FakeOcm::default());
    reconciler.inject_ocm_client(first).await.expect("inject");
    assert_eq!(drain(&mut rx).len(), 3);

    let second: Arc<dyn OcmClient> = Arc::new(FakeOcm::default());
    reconciler.inject_ocm_client(second).await.expect("inject");
    assert!(drain(&mut rx).is_empty());
    assert!(reconciler.ocm_client().await.is_some());
}

#[tokio::test]
async fn test_failed_first_injection_can_be_retried() {
    let store = three_addons();
    store.fail_list.store(true, Ordering::SeqCst);
    let log = phase_log();
    let (reconciler, mut rx) = reconciler(
        Arc::clone(&store),
        vec![RecordingPhase::boxed("a", PhaseResult::Continue, &log)],
        8,
    );

    let client: Arc<dyn OcmClient> = Arc::new(FakeOcm::default());
    reconciler
        .inject_ocm_client(Arc::clone(&client))
        .await
        .expect_err("sweep fails");
    assert!(reconciler.ocm_client().await.is_none());

    store.fail_list.store(false, Ordering::SeqCst);
    reconciler.inject_ocm_client(client).await.expect("inject");
    assert_eq!(drain(&mut rx).len(), 3);
}

#[tokio::test]
async fn test_sync_pause_only_toggles_on_change() {
    let log = phase_log();
    let (reconciler, mut rx) = reconciler(
        three_addons(),
        vec![RecordingPhase::boxed("a", PhaseResult::Continue, &log)],
        8,
    );

    assert!(!sync_pause(&reconciler, false).await.expect("sync"));
    assert!(drain(&mut rx).is_empty());

    assert!(sync_pause(&reconciler, true).await.expect("sync"));
    assert_eq!(drain(&mut rx).len(), 3);

    assert!(!sync_pause(&reconciler, true).await.expect("sync"));
    assert!(drain(&mut rx).is_empty());
    assert!(reconciler.is_paused().await);
}
