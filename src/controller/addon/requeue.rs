//! # Requeue Queue
//!
//! Bounded queue carrying Addon identities from administrative operations
//! (pause toggles, OCM client injection) to the controller, which consumes it
//! through `Controller::reconcile_on`.
//!
//! Backpressure policy: a send waits for free capacity for at most the
//! configured send timeout and then fails with [`RequeueError::Timeout`].
//! The administrative caller sees the error and is retried by its own
//! controller, so a full queue can delay a sweep but never wedge it.

use crate::controller::addon::store::{AddonStore, StoreError};
use crate::crd::Addon;
use crate::observability::metrics;
use futures::Stream;
use kube::runtime::reflector::ObjectRef;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RequeueError {
    #[error("timed out after {0:?} waiting for requeue queue capacity")]
    Timeout(Duration),
    #[error("requeue queue is closed")]
    Closed,
    #[error("failed to list addons for requeue: {0}")]
    List(#[from] StoreError),
}

/// Create a bounded requeue queue
pub fn requeue_queue(capacity: usize, send_timeout: Duration) -> (RequeueSender, RequeueReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        RequeueSender { tx, send_timeout },
        RequeueReceiver { rx },
    )
}

#[derive(Debug, Clone)]
pub struct RequeueSender {
    tx: mpsc::Sender<ObjectRef<Addon>>,
    send_timeout: Duration,
}

impl RequeueSender {
    /// Enqueue one Addon, waiting at most the send timeout for capacity
    pub async fn requeue(&self, addon: ObjectRef<Addon>) -> Result<(), RequeueError> {
        self.tx
            .send_timeout(addon, self.send_timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => RequeueError::Timeout(self.send_timeout),
                SendTimeoutError::Closed(_) => RequeueError::Closed,
            })
    }

    /// Enqueue every Addon in `store`; returns the number of events sent
    pub async fn sweep(&self, store: &dyn AddonStore) -> Result<usize, RequeueError> {
        let addons = store.list().await?;
        for addon in &addons {
            self.requeue(addon.identity()).await?;
            metrics::increment_requeues_total("admin-sweep");
        }
        debug!(count = addons.len(), "requeued all addons");
        Ok(addons.len())
    }
}

#[derive(Debug)]
pub struct RequeueReceiver {
    rx: mpsc::Receiver<ObjectRef<Addon>>,
}

impl RequeueReceiver {
    /// Non-blocking receive, `None` when the queue is currently empty
    pub fn try_recv(&mut self) -> Option<ObjectRef<Addon>> {
        self.rx.try_recv().ok()
    }

    /// Stream of requeue events for `Controller::reconcile_on`
    pub fn into_stream(self) -> impl Stream<Item = ObjectRef<Addon>> + Send + 'static {
        futures::stream::unfold(self.rx, |mut rx| async move {
            rx.recv().await.map(|addon| (addon, rx))
        })
    }
}
