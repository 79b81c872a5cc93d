//! # Error Policy
//!
//! Error handling and backoff logic for the Addon controller.

use crate::controller::addon::{AddonReconciler, ReconcilerError};
use crate::crd::Addon;
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info};

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per Addon so one failing Addon does not slow down
/// the others. A successful reconcile resets it.
pub fn handle_reconciliation_error(
    addon: Arc<Addon>,
    error: &ReconcilerError,
    ctx: Arc<AddonReconciler>,
) -> Action {
    let name = addon.name_any();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        addon.name = name.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}: {}", name, error);
    observability::metrics::increment_reconciliation_errors();

    let (backoff, error_count) = ctx.next_backoff(&name);
    info!(
        "🔄 Retrying with Fibonacci backoff: {}s after {} consecutive error(s) (trigger source: error-backoff)",
        backoff.as_secs(),
        error_count
    );
    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(backoff)
}
