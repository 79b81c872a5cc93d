//! # OCM Client Handle
//!
//! Swappable reference to the upgrade-policy client. Starts empty; reporting
//! is skipped until a client has been injected.

use crate::controller::addon::requeue::{RequeueError, RequeueSender};
use crate::controller::addon::store::AddonStore;
use crate::ocm::OcmClient;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub struct OcmClientHandle {
    client: RwLock<Option<Arc<dyn OcmClient>>>,
    store: Arc<dyn AddonStore>,
    requeue: RequeueSender,
}

impl std::fmt::Debug for OcmClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcmClientHandle").finish_non_exhaustive()
    }
}

impl OcmClientHandle {
    pub fn new(store: Arc<dyn AddonStore>, requeue: RequeueSender) -> Self {
        Self {
            client: RwLock::new(None),
            store,
            requeue,
        }
    }

    /// Store `client`; the first injection requeues every Addon
    ///
    /// Addons reconciled before OCM was reachable never reported their
    /// upgrade status, so they are re-evaluated once a client exists. A failed
    /// sweep leaves the handle untouched and the injection can be retried.
    pub async fn inject(&self, client: Arc<dyn OcmClient>) -> Result<(), RequeueError> {
        let mut current = self.client.write().await;
        if current.is_none() {
            info!("OCM client initialized for the first time");
            self.requeue.sweep(self.store.as_ref()).await?;
        }
        *current = Some(client);
        Ok(())
    }

    /// Current client, if any
    pub async fn get(&self) -> Option<Arc<dyn OcmClient>> {
        self.client.read().await.clone()
    }
}
