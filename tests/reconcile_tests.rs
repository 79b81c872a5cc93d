//! # Addon Reconcile Tests
//!
//! Drives `AddonReconciler::reconcile` against in-memory fakes.
//!
//! These tests verify:
//! - Deletion is handled before any pause check and forgets metrics and backoff
//! - Global and per-Addon pause short-circuit the pipeline and still persist status
//! - Phase outcomes (stop, retry, error) end the pipeline in order
//! - The cache finalizer is written once
//! - Upgrade-policy reporting transitions from started to completed
//! - An OCM failure is returned after the status has been persisted

mod common;

use addon_operator::constants::CACHE_FINALIZER;
use addon_operator::controller::addon::{
    requeue_queue, AddonReconciler, CsvEventHandler, PhaseResult, ReconcilerError,
    RequeueResult, SetupError,
};
use addon_operator::crd::conditions::{self, find_condition, reason};
use addon_operator::crd::{
    Addon, AddonPhase, AddonUpgradePolicy, AddonUpgradePolicyValue, ConditionStatus,
};
use addon_operator::observability::Recorder;
use addon_operator::ocm::{OcmClient, UpgradePolicyValue};
use common::{
    addon, deleted_addon, invoked, phase_log, reconciler, FakeOcm, FakeStore, RecordingPhase,
};
use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn identity(name: &str) -> ObjectRef<Addon> {
    ObjectRef::new(name)
}

fn available(addon: &Addon) -> (ConditionStatus, String) {
    let condition =
        find_condition(addon.conditions(), conditions::AVAILABLE).expect("Available condition");
    (condition.status, condition.reason.clone())
}

fn count_available(addon: &Addon) -> usize {
    addon
        .conditions()
        .iter()
        .filter(|c| c.r#type == conditions::AVAILABLE)
        .count()
}

#[tokio::test]
async fn test_missing_addon_is_done_without_writes() {
    let store = FakeStore::with_addons([]);
    let log = phase_log();
    let (reconciler, _rx) = reconciler(
        Arc::clone(&store),
        vec![RecordingPhase::boxed("a", PhaseResult::Continue, &log)],
        8,
    );

    let result = reconciler.reconcile(&identity("gone")).await.expect("reconcile");

    assert_eq!(result, RequeueResult::Done);
    assert!(invoked(&log).is_empty());
    assert_eq!(store.status_updates(), 0);
}

#[tokio::test]
async fn test_deletion_bypasses_pause_and_phases() {
    let store = FakeStore::with_addons([deleted_addon("doomed", true)]);
    let log = phase_log();
    let (reconciler, _rx) = reconciler(
        Arc::clone(&store),
        vec![RecordingPhase::boxed("a", PhaseResult::Continue, &log)],
        8,
    );
    reconciler.enable_global_pause().await.expect("pause");

    let result = reconciler.reconcile(&identity("doomed")).await.expect("reconcile");

    assert_eq!(result, RequeueResult::Done);
    assert!(invoked(&log).is_empty());
    let stored = store.stored("doomed").expect("stored addon");
    assert!(!stored.has_finalizer(CACHE_FINALIZER));
    assert_eq!(
        stored.status.as_ref().and_then(|s| s.phase),
        Some(AddonPhase::Terminating)
    );
    assert_eq!(store.status_updates(), 1);
}

#[tokio::test]
async fn test_deletion_forgets_metrics_and_backoff() {
    let store = FakeStore::with_addons([addon("leaving", false, serde_json::json!({}))]);
    let log = phase_log();
    let (reconciler, _rx) = reconciler(
        Arc::clone(&store),
        vec![RecordingPhase::boxed("a", PhaseResult::Continue, &log)],
        8,
    );

    reconciler.reconcile(&identity("leaving")).await.expect("reconcile");
    assert!(reconciler.recorder().is_tracked("leaving-uid"));
    assert_eq!(reconciler.recorder().addons_total(), 1);
    assert_eq!(reconciler.recorder().addons_available(), 1);

    reconciler.next_backoff("leaving");
    let (_, errors) = reconciler.next_backoff("leaving");
    assert_eq!(errors, 2);

    let mut deleting = deleted_addon("leaving", false);
    deleting.status = store.stored("leaving").and_then(|a| a.status);
    store.insert(deleting);
    reconciler.reconcile(&identity("leaving")).await.expect("reconcile");

    assert!(!reconciler.recorder().is_tracked("leaving-uid"));
    assert_eq!(reconciler.recorder().addons_total(), 0);
    assert_eq!(reconciler.recorder().addons_available(), 0);
    let (_, errors) = reconciler.next_backoff("leaving");
    assert_eq!(errors, 1);
}

#[tokio::test]
async fn test_global_pause_reports_single_available_condition() {
    let store = FakeStore::with_addons([addon("paused", false, serde_json::json!({}))]);
    let log = phase_log();
    let (reconciler, _rx) = reconciler(
        Arc::clone(&store),
        vec![RecordingPhase::boxed("a", PhaseResult::Continue, &log)],
        8,
    );
    reconciler.enable_global_pause().await.expect("pause");

    let result = reconciler.reconcile(&identity("paused")).await.expect("reconcile");

    assert_eq!(result, RequeueResult::Done);
    assert!(invoked(&log).is_empty());
    assert_eq!(store.finalizer_updates(), 0);
    assert_eq!(store.status_updates(), 1);

    let stored = store.stored("paused").expect("stored addon");
    assert_eq!(count_available(&stored), 1);
    assert_eq!(
        available(&stored),
        (
            ConditionStatus::False,
            reason::ADDON_OPERATOR_PAUSED.to_string()
        )
    );
    let paused = find_condition(stored.conditions(), conditions::PAUSED).expect("Paused");
    assert_eq!(paused.status, ConditionStatus::True);
    assert_eq!(
        stored.status.as_ref().and_then(|s| s.observed_generation),
        Some(3)
    );
}

#[tokio::test]
async fn test_addon_pause_uses_addon_reason() {
    let store = FakeStore::with_addons([addon("mine", true, serde_json::json!({}))]);
    let log = phase_log();
    let (reconciler, _rx) = reconciler(
        Arc::clone(&store),
        vec![RecordingPhase::boxed("a", PhaseResult::Continue, &log)],
        8,
    );

    reconciler.reconcile(&identity("mine")).await.expect("reconcile");

    assert!(invoked(&log).is_empty());
    let stored = store.stored("mine").expect("stored addon");
    assert_eq!(
        available(&stored),
        (ConditionStatus::False, reason::ADDON_PAUSED.to_string())
    );
    assert_eq!(
        stored.status.as_ref().and_then(|s| s.phase),
        Some(AddonPhase::Pending)
    );
}

#[tokio::test]
async fn test_resume_removes_paused_condition() {
    let store = FakeStore::with_addons([addon("resumed", false, serde_json::json!({}))]);
    let log = phase_log();
    let (reconciler, _rx) = reconciler(
        Arc::clone(&store),
        vec![RecordingPhase::boxed("a", PhaseResult::Continue, &log)],
        8,
    );

    reconciler.enable_global_pause().await.expect("pause");
    reconciler.reconcile(&identity("resumed")).await.expect("reconcile");
    reconciler.disable_global_pause().await.expect("resume");
    reconciler.reconcile(&identity("resumed")).await.expect("reconcile");

    let stored = store.stored("resumed").expect("stored addon");
    assert!(find_condition(stored.conditions(), conditions::PAUSED).is_none());
    assert_eq!(
        available(&stored),
        (ConditionStatus::True, reason::FULLY_RECONCILED.to_string())
    );
}

#[tokio::test]
async fn test_retry_after_short_circuits_later_phases() {
    let store = FakeStore::with_addons([addon("retry", false, serde_json::json!({}))]);
    let log = phase_log();
    let (reconciler, _rx) = reconciler(
        Arc::clone(&store),
        vec![
            RecordingPhase::boxed("namespace", PhaseResult::Continue, &log),
            RecordingPhase::boxed(
                "pull-secrets",
                PhaseResult::RetryAfter(Duration::from_secs(5)),
                &log,
            ),
            RecordingPhase::boxed("addon-instance", PhaseResult::Continue, &log),
            RecordingPhase::boxed("olm", PhaseResult::Continue, &log),
            RecordingPhase::boxed("monitoring", PhaseResult::Continue, &log),
        ],
        8,
    );

    let result = reconciler.reconcile(&identity("retry")).await.expect("reconcile");

    assert_eq!(result, RequeueResult::RequeueAfter(Duration::from_secs(5)));
    assert_eq!(invoked(&log), vec!["namespace", "pull-secrets"]);
    assert_eq!(store.status_updates(), 1);
}

#[tokio::test]
async fn test_stop_ends_pipeline_without_requeue() {
    let store = FakeStore::with_addons([addon("stop", false, serde_json::json!({}))]);
    let log = phase_log();
    let (reconciler, _rx) = reconciler(
        Arc::clone(&store),
        vec![
            RecordingPhase::boxed("a", PhaseResult::Stop, &log),
            RecordingPhase::boxed("b", PhaseResult::Continue, &log),
        ],
        8,
    );

    let result = reconciler.reconcile(&identity("stop")).await.expect("reconcile");

    assert_eq!(result, RequeueResult::Done);
    assert_eq!(invoked(&log), vec!["a"]);
}

#[tokio::test]
async fn test_phase_error_skips_post_processing() {
    let store = FakeStore::with_addons([addon("broken", false, serde_json::json!({}))]);
    let log = phase_log();
    let (reconciler, _rx) = reconciler(
        Arc::clone(&store),
        vec![
            RecordingPhase::boxed("a", PhaseResult::Continue, &log),
            RecordingPhase::failing("b", &log),
            RecordingPhase::boxed("c", PhaseResult::Continue, &log),
        ],
        8,
    );

    let err = reconciler
        .reconcile(&identity("broken"))
        .await
        .expect_err("phase error");

    assert!(matches!(err, ReconcilerError::Phase { phase: "b", .. }));
    assert_eq!(err.to_string(), "b : failed to reconcile : b exploded");
    assert_eq!(invoked(&log), vec!["a", "b"]);
    assert_eq!(store.status_updates(), 0);
}

#[tokio::test]
async fn test_all_phases_continue_marks_ready_and_adds_finalizer_once() {
    let store = FakeStore::with_addons([addon("happy", false, serde_json::json!({}))]);
    let log = phase_log();
    let (reconciler, _rx) = reconciler(
        Arc::clone(&store),
        vec![
            RecordingPhase::boxed("a", PhaseResult::Continue, &log),
            RecordingPhase::boxed("b", PhaseResult::Continue, &log),
        ],
        8,
    );

    reconciler.reconcile(&identity("happy")).await.expect("reconcile");
    reconciler.reconcile(&identity("happy")).await.expect("reconcile");

    assert_eq!(invoked(&log), vec!["a", "b", "a", "b"]);
    assert_eq!(store.finalizer_updates(), 1);
    let stored = store.stored("happy").expect("stored addon");
    assert!(stored.has_finalizer(CACHE_FINALIZER));
    assert_eq!(count_available(&stored), 1);
    assert_eq!(
        available(&stored),
        (ConditionStatus::True, reason::FULLY_RECONCILED.to_string())
    );
    assert_eq!(
        stored.status.as_ref().and_then(|s| s.phase),
        Some(AddonPhase::Ready)
    );
    assert_eq!(reconciler.recorder().addons_available(), 1);
}

#[tokio::test]
async fn test_status_update_failure_is_returned() {
    let store = FakeStore::with_addons([addon("flaky", false, serde_json::json!({}))]);
    store.fail_status.store(true, Ordering::SeqCst);
    let log = phase_log();
    let (reconciler, _rx) = reconciler(
        Arc::clone(&store),
        vec![RecordingPhase::boxed("a", PhaseResult::Continue, &log)],
        8,
    );

    let err = reconciler
        .reconcile(&identity("flaky"))
        .await
        .expect_err("status failure");

    assert!(matches!(err, ReconcilerError::StatusUpdate(_)));
}

#[tokio::test]
async fn test_upgrade_policy_reported_started_then_completed() {
    let mut upgrading = addon("upgrading", false, serde_json::json!({}));
    upgrading.spec.upgrade_policy = Some(AddonUpgradePolicy {
        id: "policy-1".to_string(),
    });
    let store = FakeStore::with_addons([upgrading]);
    let ocm = Arc::new(FakeOcm::default());
    let client: Arc<dyn OcmClient> = Arc::clone(&ocm) as Arc<dyn OcmClient>;
    let log = phase_log();

    let (installing, _rx1) = reconciler(
        Arc::clone(&store),
        vec![RecordingPhase::boxed(
            "olm",
            PhaseResult::RetryAfter(Duration::from_secs(10)),
            &log,
        )],
        8,
    );
    installing
        .inject_ocm_client(Arc::clone(&client))
        .await
        .expect("inject");
    installing
        .reconcile(&identity("upgrading"))
        .await
        .expect("reconcile");

    let (installed, _rx2) = reconciler(
        Arc::clone(&store),
        vec![RecordingPhase::boxed("olm", PhaseResult::Continue, &log)],
        8,
    );
    installed.inject_ocm_client(client).await.expect("inject");
    installed
        .reconcile(&identity("upgrading"))
        .await
        .expect("reconcile");
    installed
        .reconcile(&identity("upgrading"))
        .await
        .expect("reconcile");

    assert_eq!(
        ocm.patched_values(),
        vec![UpgradePolicyValue::Started, UpgradePolicyValue::Completed]
    );
    let stored = store.stored("upgrading").expect("stored addon");
    let reported = stored
        .status
        .as_ref()
        .and_then(|s| s.upgrade_policy.clone())
        .expect("upgrade policy status");
    assert_eq!(reported.value, AddonUpgradePolicyValue::Completed);
    assert_eq!(reported.version.as_deref(), Some("1.0.0"));
    assert_eq!(reported.observed_generation, 3);
    assert_eq!(stored.name_any(), "upgrading");
}

#[tokio::test]
async fn test_upgrade_policy_failure_is_returned_after_status_persist() {
    let mut upgrading = addon("unreported", false, serde_json::json!({}));
    upgrading.spec.upgrade_policy = Some(AddonUpgradePolicy {
        id: "policy-2".to_string(),
    });
    let store = FakeStore::with_addons([upgrading]);
    let ocm = Arc::new(FakeOcm::default());
    ocm.unavailable.store(true, Ordering::SeqCst);
    let log = phase_log();
    let (reconciler, _rx) = reconciler(
        Arc::clone(&store),
        vec![RecordingPhase::boxed("olm", PhaseResult::Continue, &log)],
        8,
    );
    reconciler
        .inject_ocm_client(Arc::clone(&ocm) as Arc<dyn OcmClient>)
        .await
        .expect("inject");

    let err = reconciler
        .reconcile(&identity("unreported"))
        .await
        .expect_err("OCM unavailable");

    assert!(matches!(err, ReconcilerError::UpgradePolicy(_)));
    assert!(ocm.patched_values().is_empty());
    assert_eq!(store.status_updates(), 1);
    let stored = store.stored("unreported").expect("stored addon");
    assert_eq!(
        available(&stored),
        (ConditionStatus::True, reason::FULLY_RECONCILED.to_string())
    );
    assert!(stored
        .status
        .as_ref()
        .is_some_and(|s| s.upgrade_policy.is_none()));

    ocm.unavailable.store(false, Ordering::SeqCst);
    reconciler
        .reconcile(&identity("unreported"))
        .await
        .expect("reconcile after OCM recovers");
    assert_eq!(ocm.patched_values(), vec![UpgradePolicyValue::Completed]);
}

#[tokio::test]
async fn test_builder_requires_csv_event_handler() {
    let (sender, _rx) = requeue_queue(1, Duration::from_millis(10));
    let log = phase_log();
    let err = AddonReconciler::builder()
        .store(FakeStore::with_addons([]))
        .phases(vec![RecordingPhase::boxed("a", PhaseResult::Continue, &log)])
        .requeue_sender(sender)
        .recorder(Arc::new(Recorder::new().expect("recorder")))
        .build()
        .expect_err("missing csv handler");

    assert!(matches!(err, SetupError::MissingCsvEventHandler));
}

#[tokio::test]
async fn test_builder_requires_phases() {
    let (sender, _rx) = requeue_queue(1, Duration::from_millis(10));
    let err = AddonReconciler::builder()
        .store(FakeStore::with_addons([]))
        .csv_event_handler(Arc::new(CsvEventHandler::new()))
        .requeue_sender(sender)
        .recorder(Arc::new(Recorder::new().expect("recorder")))
        .build()
        .expect_err("no phases");

    assert!(matches!(err, SetupError::NoPhases));
}
