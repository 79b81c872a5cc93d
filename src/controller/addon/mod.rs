//! # Addon Reconciler
//!
//! Reconciles `Addon` resources through an ordered phase pipeline and owns the
//! administrative state that influences every reconcile: the global pause flag
//! and the OCM client handle.
//!
//! - `csv_handler`: reverse index routing ClusterServiceVersion events to Addons
//! - `ocm_handle`: swappable OCM client
//! - `pause`: global pause coordination
//! - `phases`: the installation pipeline
//! - `reconcile`: reconcile entry points
//! - `requeue`: bounded requeue queue fed by administrative sweeps
//! - `status`: condition and phase helpers
//! - `store`: Addon reads and writes
//! - `types`: error and result types
//! - `upgrade_policy`: OCM upgrade-policy reporting
//! - `watches`: controller and watch wiring

pub mod csv_handler;
pub mod ocm_handle;
pub mod pause;
pub mod phases;
pub mod reconcile;
pub mod requeue;
pub mod status;
pub mod store;
pub mod types;
pub mod upgrade_policy;
pub mod watches;

pub use csv_handler::{CsvEventHandler, CsvKey};
pub use phases::{Phase, PhaseResult};
pub use reconcile::reconcile;
pub use requeue::{requeue_queue, RequeueError, RequeueReceiver, RequeueSender};
pub use store::{AddonStore, KubeAddonStore, StoreError};
pub use types::{BackoffState, ReconcilerError, RequeueResult, SetupError};

use crate::config::{OperatorConfig, SharedOperatorConfig};
use crate::observability::Recorder;
use crate::ocm::OcmClient;
use ocm_handle::OcmClientHandle;
use pause::PauseCoordinator;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Shared state of the Addon controller
pub struct AddonReconciler {
    store: Arc<dyn AddonStore>,
    phases: Vec<Box<dyn Phase>>,
    pause: PauseCoordinator,
    ocm: OcmClientHandle,
    csv_handler: Arc<CsvEventHandler>,
    recorder: Arc<Recorder>,
    config: SharedOperatorConfig,
    /// Per-Addon backoff, keyed by Addon name
    backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl std::fmt::Debug for AddonReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phases: Vec<&str> = self.phases.iter().map(|p| p.name()).collect();
        f.debug_struct("AddonReconciler")
            .field("phases", &phases)
            .finish_non_exhaustive()
    }
}

impl AddonReconciler {
    pub fn builder() -> AddonReconcilerBuilder {
        AddonReconcilerBuilder::default()
    }

    /// Pause every Addon pipeline
    ///
    /// # Errors
    ///
    /// Fails when the Addon list cannot be read or the requeue queue stays full.
    pub async fn enable_global_pause(&self) -> Result<(), RequeueError> {
        self.pause.enable_global_pause().await
    }

    /// Resume every Addon pipeline
    ///
    /// # Errors
    ///
    /// Fails when the Addon list cannot be read or the requeue queue stays full.
    pub async fn disable_global_pause(&self) -> Result<(), RequeueError> {
        self.pause.disable_global_pause().await
    }

    pub async fn is_paused(&self) -> bool {
        self.pause.is_paused().await
    }

    /// Whether global pause equals `paused` with no requeue sweep left to retry
    pub async fn is_pause_settled(&self, paused: bool) -> bool {
        self.pause.is_settled(paused).await
    }

    /// Replace the OCM client used for upgrade-policy reporting
    ///
    /// # Errors
    ///
    /// The first injection requeues every Addon and fails like a pause toggle.
    pub async fn inject_ocm_client(&self, client: Arc<dyn OcmClient>) -> Result<(), RequeueError> {
        self.ocm.inject(client).await
    }

    pub async fn ocm_client(&self) -> Option<Arc<dyn OcmClient>> {
        self.ocm.get().await
    }

    pub fn csv_handler(&self) -> &Arc<CsvEventHandler> {
        &self.csv_handler
    }

    pub fn recorder(&self) -> &Arc<Recorder> {
        &self.recorder
    }

    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    /// Next error backoff for the Addon `name` and its consecutive error count
    pub fn next_backoff(&self, name: &str) -> (Duration, u32) {
        let mut states = self
            .backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let state = states.entry(name.to_string()).or_insert_with(|| {
            BackoffState::new(self.config.backoff_min_secs, self.config.backoff_max_secs)
        });
        state.increment_error();
        (state.backoff.next_backoff(), state.error_count)
    }

    /// Forget the error backoff of the Addon `name`
    pub fn reset_backoff(&self, name: &str) {
        self.backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}

/// Assembles an [`AddonReconciler`], rejecting incomplete wiring
#[derive(Default)]
pub struct AddonReconcilerBuilder {
    store: Option<Arc<dyn AddonStore>>,
    phases: Vec<Box<dyn Phase>>,
    csv_handler: Option<Arc<CsvEventHandler>>,
    requeue: Option<RequeueSender>,
    recorder: Option<Arc<Recorder>>,
    config: Option<SharedOperatorConfig>,
}

impl std::fmt::Debug for AddonReconcilerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddonReconcilerBuilder")
            .field("phases", &self.phases.len())
            .finish_non_exhaustive()
    }
}

impl AddonReconcilerBuilder {
    #[must_use]
    pub fn store(mut self, store: Arc<dyn AddonStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn phases(mut self, phases: Vec<Box<dyn Phase>>) -> Self {
        self.phases = phases;
        self
    }

    #[must_use]
    pub fn csv_event_handler(mut self, handler: Arc<CsvEventHandler>) -> Self {
        self.csv_handler = Some(handler);
        self
    }

    #[must_use]
    pub fn requeue_sender(mut self, sender: RequeueSender) -> Self {
        self.requeue = Some(sender);
        self
    }

    #[must_use]
    pub fn recorder(mut self, recorder: Arc<Recorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    #[must_use]
    pub fn config(mut self, config: SharedOperatorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// # Errors
    ///
    /// Returns a [`SetupError`] naming the first missing collaborator.
    pub fn build(self) -> Result<AddonReconciler, SetupError> {
        let store = self.store.ok_or(SetupError::MissingStore)?;
        let csv_handler = self.csv_handler.ok_or(SetupError::MissingCsvEventHandler)?;
        let requeue = self.requeue.ok_or(SetupError::MissingRequeueSender)?;
        let recorder = self.recorder.ok_or(SetupError::MissingRecorder)?;
        if self.phases.is_empty() {
            return Err(SetupError::NoPhases);
        }

        Ok(AddonReconciler {
            pause: PauseCoordinator::new(Arc::clone(&store), requeue.clone()),
            ocm: OcmClientHandle::new(Arc::clone(&store), requeue),
            store,
            phases: self.phases,
            csv_handler,
            recorder,
            config: self.config.unwrap_or_default(),
            backoff_states: Mutex::new(HashMap::new()),
        })
    }
}
