//! # Types
//!
//! Error and result types of the Addon reconciler.

use crate::controller::addon::store::StoreError;
use crate::controller::backoff::FibonacciBackoff;
use crate::ocm::OcmError;
use kube_runtime::controller::Action;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("failed to fetch addon '{name}': {source}")]
    Fetch {
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to ensure cache finalizer: {0}")]
    Finalizer(#[source] StoreError),
    #[error("{phase} : failed to reconcile : {source:#}")]
    Phase {
        phase: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to handle addon deletion: {0}")]
    Deletion(#[source] StoreError),
    #[error("failed to report upgrade policy status: {0}")]
    UpgradePolicy(#[source] OcmError),
    #[error("failed to update addon status: {0}")]
    StatusUpdate(#[source] StoreError),
}

/// Misconfiguration detected while building the reconciler
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("an addon store is required")]
    MissingStore,
    #[error("a CSV event handler is required to route ClusterServiceVersion events")]
    MissingCsvEventHandler,
    #[error("a requeue sender is required for administrative sweeps")]
    MissingRequeueSender,
    #[error("a metrics recorder is required")]
    MissingRecorder,
    #[error("no installation phases configured")]
    NoPhases,
}

/// Outcome of one Addon reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueResult {
    /// Nothing left to do until the next watch event
    Done,
    /// Reconcile again after the given delay
    RequeueAfter(Duration),
}

impl RequeueResult {
    pub fn into_action(self) -> Action {
        match self {
            RequeueResult::Done => Action::await_change(),
            RequeueResult::RequeueAfter(after) => Action::requeue(after),
        }
    }
}

/// Backoff state for a specific Addon
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}
