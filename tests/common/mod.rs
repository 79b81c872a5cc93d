//! Common test utilities for the Addon reconciler integration tests
//!
//! Provides in-memory fakes for the Addon store, the installation phases and
//! the OCM client, plus a helper wiring them into an `AddonReconciler`.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use addon_operator::controller::addon::{
    requeue_queue, AddonReconciler, AddonStore, Phase, PhaseResult, RequeueReceiver, StoreError,
};
use addon_operator::crd::Addon;
use addon_operator::observability::Recorder;
use addon_operator::ocm::{
    ClusterGetRequest, ClusterGetResponse, OcmClient, OcmError, UpgradePolicyGetRequest,
    UpgradePolicyGetResponse, UpgradePolicyPatchRequest, UpgradePolicyPatchResponse,
    UpgradePolicyValue,
};
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Build an Addon from a minimal manifest
///
/// `extra_metadata` is merged into `metadata`, e.g. a `deletionTimestamp`.
pub fn addon(name: &str, paused: bool, extra_metadata: serde_json::Value) -> Addon {
    let mut metadata = serde_json::json!({
        "name": name,
        "uid": format!("{name}-uid"),
        "generation": 3,
        "resourceVersion": "1",
    });
    if let (Some(base), Some(extra)) = (metadata.as_object_mut(), extra_metadata.as_object()) {
        base.extend(extra.clone());
    }

    serde_json::from_value(serde_json::json!({
        "apiVersion": "addons.managed.openshift.io/v1alpha1",
        "kind": "Addon",
        "metadata": metadata,
        "spec": {
            "displayName": name,
            "version": "1.0.0",
            "paused": paused,
            "install": {
                "type": "OLMOwnNamespace",
                "olmOwnNamespace": {
                    "namespace": format!("{name}-ns"),
                    "catalogSourceImage": "quay.io/osd-addons/test-index:latest",
                    "channel": "alpha",
                    "packageName": name,
                }
            }
        }
    }))
    .expect("valid addon manifest")
}

/// An Addon whose deletion has been requested
pub fn deleted_addon(name: &str, paused: bool) -> Addon {
    addon(
        name,
        paused,
        serde_json::json!({
            "deletionTimestamp": "2024-01-01T00:00:00Z",
            "finalizers": ["addons.managed.openshift.io/cache"],
        }),
    )
}

/// In-memory Addon store counting its writes
#[derive(Debug, Default)]
pub struct FakeStore {
    addons: Mutex<BTreeMap<String, Addon>>,
    pub status_updates: AtomicUsize,
    pub finalizer_updates: AtomicUsize,
    pub fail_status: AtomicBool,
    pub fail_list: AtomicBool,
}

impl FakeStore {
    pub fn with_addons(addons: impl IntoIterator<Item = Addon>) -> Arc<Self> {
        let store = Self::default();
        {
            let mut map = store.addons.lock().expect("store lock");
            for addon in addons {
                map.insert(addon.name_any(), addon);
            }
        }
        Arc::new(store)
    }

    pub fn insert(&self, addon: Addon) {
        self.addons
            .lock()
            .expect("store lock")
            .insert(addon.name_any(), addon);
    }

    pub fn stored(&self, name: &str) -> Option<Addon> {
        self.addons.lock().expect("store lock").get(name).cloned()
    }

    pub fn status_updates(&self) -> usize {
        self.status_updates.load(Ordering::SeqCst)
    }

    pub fn finalizer_updates(&self) -> usize {
        self.finalizer_updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddonStore for FakeStore {
    async fn get(&self, name: &str) -> Result<Option<Addon>, StoreError> {
        Ok(self.stored(name))
    }

    async fn list(&self) -> Result<Vec<Addon>, StoreError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout(Duration::from_secs(1)));
        }
        Ok(self.addons.lock().expect("store lock").values().cloned().collect())
    }

    async fn update_finalizers(&self, addon: &Addon) -> Result<Addon, StoreError> {
        self.finalizer_updates.fetch_add(1, Ordering::SeqCst);
        let mut map = self.addons.lock().expect("store lock");
        let stored = map
            .get_mut(&addon.name_any())
            .ok_or_else(|| StoreError::NotFound(addon.name_any()))?;
        stored.metadata.finalizers = addon.metadata.finalizers.clone();
        Ok(stored.clone())
    }

    async fn update_status(&self, addon: &Addon) -> Result<(), StoreError> {
        self.status_updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout(Duration::from_secs(1)));
        }
        let mut map = self.addons.lock().expect("store lock");
        let stored = map
            .get_mut(&addon.name_any())
            .ok_or_else(|| StoreError::NotFound(addon.name_any()))?;
        stored.status.clone_from(&addon.status);
        Ok(())
    }
}

pub type PhaseLog = Arc<Mutex<Vec<&'static str>>>;

/// Phase that records its invocation and returns a fixed outcome
#[derive(Debug)]
pub struct RecordingPhase {
    name: &'static str,
    result: Option<PhaseResult>,
    log: PhaseLog,
}

impl RecordingPhase {
    pub fn boxed(name: &'static str, result: PhaseResult, log: &PhaseLog) -> Box<dyn Phase> {
        Box::new(Self {
            name,
            result: Some(result),
            log: Arc::clone(log),
        })
    }

    /// A phase that always fails
    pub fn failing(name: &'static str, log: &PhaseLog) -> Box<dyn Phase> {
        Box::new(Self {
            name,
            result: None,
            log: Arc::clone(log),
        })
    }
}

#[async_trait]
impl Phase for RecordingPhase {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn reconcile(&self, _addon: &mut Addon) -> anyhow::Result<PhaseResult> {
        self.log.lock().expect("log lock").push(self.name);
        self.result
            .ok_or_else(|| anyhow::anyhow!("{} exploded", self.name))
    }
}

pub fn phase_log() -> PhaseLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn invoked(log: &PhaseLog) -> Vec<&'static str> {
    log.lock().expect("log lock").clone()
}

/// OCM fake holding the server-side value of every upgrade policy
#[derive(Debug, Default)]
pub struct FakeOcm {
    policies: Mutex<BTreeMap<String, UpgradePolicyValue>>,
    pub patches: Mutex<Vec<UpgradePolicyPatchRequest>>,
    /// Answer every upgrade-policy request with a 503
    pub unavailable: AtomicBool,
}

impl FakeOcm {
    fn check_available(&self, method: &'static str, id: &str) -> Result<(), OcmError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OcmError::Status {
                method,
                path: format!("/upgrade_policies/{id}/state"),
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(())
    }

    pub fn patched_values(&self) -> Vec<UpgradePolicyValue> {
        self.patches
            .lock()
            .expect("patch lock")
            .iter()
            .map(|p| p.value)
            .collect()
    }
}

#[async_trait]
impl OcmClient for FakeOcm {
    async fn get_cluster(&self, req: ClusterGetRequest) -> Result<ClusterGetResponse, OcmError> {
        Ok(ClusterGetResponse {
            id: "cluster-1".to_string(),
            external_id: req.cluster_external_id,
            display_name: "test".to_string(),
        })
    }

    async fn patch_upgrade_policy(
        &self,
        req: UpgradePolicyPatchRequest,
    ) -> Result<UpgradePolicyPatchResponse, OcmError> {
        self.check_available("PATCH", &req.id)?;
        self.policies
            .lock()
            .expect("policy lock")
            .insert(req.id.clone(), req.value);
        let response = UpgradePolicyPatchResponse {
            value: Some(req.value),
            description: req.description.clone(),
        };
        self.patches.lock().expect("patch lock").push(req);
        Ok(response)
    }

    async fn get_upgrade_policy(
        &self,
        req: UpgradePolicyGetRequest,
    ) -> Result<UpgradePolicyGetResponse, OcmError> {
        self.check_available("GET", &req.id)?;
        Ok(UpgradePolicyGetResponse {
            value: self.policies.lock().expect("policy lock").get(&req.id).copied(),
            description: String::new(),
        })
    }
}

/// Wire `store` and `phases` into a reconciler with a requeue queue of `capacity`
pub fn reconciler(
    store: Arc<FakeStore>,
    phases: Vec<Box<dyn Phase>>,
    capacity: usize,
) -> (AddonReconciler, RequeueReceiver) {
    let (sender, receiver) = requeue_queue(capacity, Duration::from_millis(50));
    let reconciler = AddonReconciler::builder()
        .store(store)
        .phases(phases)
        .csv_event_handler(Arc::new(
            addon_operator::controller::addon::CsvEventHandler::new(),
        ))
        .requeue_sender(sender)
        .recorder(Arc::new(Recorder::new().expect("recorder metrics")))
        .build()
        .expect("complete reconciler wiring");
    (reconciler, receiver)
}

/// Pull every queued identity without waiting
pub fn drain(receiver: &mut RequeueReceiver) -> Vec<String> {
    let mut names = Vec::new();
    while let Some(identity) = receiver.try_recv() {
        names.push(identity.name);
    }
    names
}
