//! # Reconciliation Logic
//!
//! One reconcile of an Addon:
//!
//! 1. Fetch the Addon; a missing Addon ends the reconcile.
//! 2. Deletion is handled before any pause check so paused Addons can still be removed.
//! 3. Global pause, then per-Addon pause, short-circuit the pipeline.
//! 4. Otherwise the cache finalizer is ensured and the phases run in order.
//! 5. Post-processing (metrics, upgrade-policy reporting, status persist)
//!    runs on every exit that did not produce an error.

use crate::constants::CACHE_FINALIZER;
use crate::controller::addon::phases::PhaseResult;
use crate::controller::addon::status;
use crate::controller::addon::store::StoreError;
use crate::controller::addon::types::{ReconcilerError, RequeueResult};
use crate::controller::addon::upgrade_policy::report_upgrade_policy_status;
use crate::controller::addon::AddonReconciler;
use crate::crd::conditions::reason;
use crate::crd::Addon;
use crate::observability::metrics;
use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// Entry point used by the kube-runtime controller
pub async fn reconcile(
    addon: Arc<Addon>,
    ctx: Arc<AddonReconciler>,
) -> Result<Action, ReconcilerError> {
    let start = Instant::now();
    metrics::increment_reconciliations();

    let span = tracing::info_span!(
        "reconcile",
        addon.name = %addon.name_any(),
        addon.uid = addon.metadata.uid.as_deref().unwrap_or_default()
    );
    let result = ctx.reconcile(&addon.identity()).instrument(span).await;
    metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

    let result = result?;
    ctx.reset_backoff(&addon.name_any());
    if let RequeueResult::RequeueAfter(after) = result {
        debug!(addon = %addon.name_any(), ?after, "requeueing addon");
        metrics::increment_requeues_total("retry-after");
    }
    Ok(result.into_action())
}

impl AddonReconciler {
    /// Reconcile the Addon identified by `identity`
    pub async fn reconcile(
        &self,
        identity: &ObjectRef<Addon>,
    ) -> Result<RequeueResult, ReconcilerError> {
        let name = identity.name.as_str();
        let fetched = match self.store.get(name).await {
            Ok(addon) => addon,
            Err(StoreError::NotFound(_)) => None,
            Err(source) => {
                return Err(ReconcilerError::Fetch {
                    name: name.to_string(),
                    source,
                })
            }
        };
        let Some(mut addon) = fetched else {
            debug!(addon = name, "addon no longer exists");
            return Ok(RequeueResult::Done);
        };

        let result = self.reconcile_addon(&mut addon).await?;

        self.post_process(&mut addon).await?;
        Ok(result)
    }

    async fn reconcile_addon(&self, addon: &mut Addon) -> Result<RequeueResult, ReconcilerError> {
        if addon.is_deletion_requested() {
            return self.handle_addon_deletion(addon).await;
        }

        if self.pause.is_paused().await {
            debug!("addon operator is paused, skipping pipeline");
            status::report_addon_pause_status(addon, reason::ADDON_OPERATOR_PAUSED);
            return Ok(RequeueResult::Done);
        }

        if addon.spec.paused {
            debug!("addon is paused, skipping pipeline");
            status::report_addon_pause_status(addon, reason::ADDON_PAUSED);
            return Ok(RequeueResult::Done);
        }

        status::remove_addon_pause_condition(addon);
        self.ensure_cache_finalizer(addon).await?;

        for phase in &self.phases {
            let result = phase
                .reconcile(addon)
                .await
                .map_err(|source| ReconcilerError::Phase {
                    phase: phase.name(),
                    source,
                })?;
            match result {
                PhaseResult::Continue => {}
                PhaseResult::Stop => {
                    debug!(phase = phase.name(), "phase stopped the pipeline");
                    return Ok(RequeueResult::Done);
                }
                PhaseResult::RetryAfter(after) => {
                    debug!(phase = phase.name(), ?after, "phase requested retry");
                    return Ok(RequeueResult::RequeueAfter(after));
                }
            }
        }

        status::report_ready_status(addon);
        info!("✅ addon fully reconciled");
        Ok(RequeueResult::Done)
    }

    async fn ensure_cache_finalizer(&self, addon: &mut Addon) -> Result<(), ReconcilerError> {
        if !addon.add_finalizer(CACHE_FINALIZER) {
            return Ok(());
        }
        let updated = self
            .store
            .update_finalizers(addon)
            .await
            .map_err(ReconcilerError::Finalizer)?;
        addon.metadata = updated.metadata;
        Ok(())
    }

    async fn handle_addon_deletion(
        &self,
        addon: &mut Addon,
    ) -> Result<RequeueResult, ReconcilerError> {
        info!("addon is being deleted");
        self.csv_handler.free(&addon.identity());
        self.reset_backoff(&addon.name_any());

        if addon.remove_finalizer(CACHE_FINALIZER) {
            match self.store.update_finalizers(addon).await {
                Ok(updated) => addon.metadata = updated.metadata,
                Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(ReconcilerError::Deletion(e)),
            }
        }

        status::report_terminating_status(addon);
        Ok(RequeueResult::Done)
    }

    async fn post_process(&self, addon: &mut Addon) -> Result<(), ReconcilerError> {
        self.recorder.record_addon_metrics(addon);

        let reported = report_upgrade_policy_status(
            self.ocm.get().await,
            &self.recorder,
            self.config.api_timeout(),
            addon,
        )
        .await;

        let generation = addon.metadata.generation;
        addon.status_mut().observed_generation = generation;
        let persisted = match self.store.update_status(addon).await {
            Err(StoreError::NotFound(_)) if addon.is_deletion_requested() => Ok(()),
            other => other,
        };

        if let Err(e) = &persisted {
            warn!(error = %e, "failed to persist addon status");
        }
        reported.map_err(ReconcilerError::UpgradePolicy)?;
        persisted.map_err(ReconcilerError::StatusUpdate)
    }
}
