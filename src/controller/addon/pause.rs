//! # Global Pause
//!
//! Operator-wide pause switch. Reconciles only copy the flag under the read
//! lock; toggles hold the write lock while flipping the flag and sweeping
//! every Addon into the requeue queue, so no reconcile observes the new value
//! before its requeue event has been handed over.
//!
//! A sweep that fails leaves the toggle pending. The flag keeps its new value
//! and [`PauseCoordinator::is_settled`] reports false until a later toggle to
//! the same value completes its sweep.

use crate::controller::addon::requeue::{RequeueError, RequeueSender};
use crate::controller::addon::store::AddonStore;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Default)]
struct PauseState {
    paused: bool,
    sweep_pending: bool,
}

pub struct PauseCoordinator {
    state: RwLock<PauseState>,
    store: Arc<dyn AddonStore>,
    requeue: RequeueSender,
}

impl std::fmt::Debug for PauseCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PauseCoordinator").finish_non_exhaustive()
    }
}

impl PauseCoordinator {
    pub fn new(store: Arc<dyn AddonStore>, requeue: RequeueSender) -> Self {
        Self {
            state: RwLock::new(PauseState::default()),
            store,
            requeue,
        }
    }

    pub async fn is_paused(&self) -> bool {
        self.state.read().await.paused
    }

    /// Whether the flag equals `paused` and its requeue sweep has completed
    pub async fn is_settled(&self, paused: bool) -> bool {
        let state = self.state.read().await;
        state.paused == paused && !state.sweep_pending
    }

    /// Pause all Addon pipelines and requeue every Addon
    pub async fn enable_global_pause(&self) -> Result<(), RequeueError> {
        self.set_paused(true).await
    }

    /// Resume all Addon pipelines and requeue every Addon
    pub async fn disable_global_pause(&self) -> Result<(), RequeueError> {
        self.set_paused(false).await
    }

    async fn set_paused(&self, paused: bool) -> Result<(), RequeueError> {
        let mut state = self.state.write().await;
        state.paused = paused;
        state.sweep_pending = true;
        let count = self.requeue.sweep(self.store.as_ref()).await?;
        state.sweep_pending = false;
        info!(paused, requeued = count, "global pause updated");
        Ok(())
    }
}
