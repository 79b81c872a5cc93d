use super::{addon_labels, controller_owner_ref, is_controlled_by, Phase, PhaseContext, PhaseResult};
use crate::constants::DEFAULT_RETRY_AFTER;
use crate::controller::addon::status;
use crate::crd::Addon;
use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::Api;
use tracing::{debug, warn};

const NAMESPACE_ACTIVE: &str = "Active";

/// Ensures every namespace listed in `spec.namespaces` exists and is owned by the Addon
///
/// A namespace that already exists without this Addon as its controller is a
/// collision: the pipeline stops and the Addon is marked `CollidedNamespaces`.
#[derive(Debug)]
pub struct NamespacePhase {
    ctx: PhaseContext,
}

impl NamespacePhase {
    pub fn new(ctx: PhaseContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Phase for NamespacePhase {
    fn name(&self) -> &'static str {
        "ensure namespaces"
    }

    async fn reconcile(&self, addon: &mut Addon) -> Result<PhaseResult> {
        let api: Api<Namespace> = Api::all(self.ctx.client());
        let owner = controller_owner_ref(addon)?;

        let mut collided = Vec::new();
        let mut unready = Vec::new();

        for ns in &addon.spec.namespaces {
            let existing = self
                .ctx
                .bounded(&format!("get namespace {}", ns.name), api.get_opt(&ns.name))
                .await?;
            if existing
                .as_ref()
                .is_some_and(|existing| !is_controlled_by(existing, &owner.uid))
            {
                warn!(namespace = %ns.name, "namespace exists and is not owned by this addon");
                collided.push(ns.name.clone());
                continue;
            }

            let desired = Namespace {
                metadata: ObjectMeta {
                    name: Some(ns.name.clone()),
                    labels: Some(addon_labels(addon)),
                    owner_references: Some(vec![owner.clone()]),
                    ..ObjectMeta::default()
                },
                ..Namespace::default()
            };
            let applied = self.ctx.apply(&api, &desired).await?;

            let phase = applied.status.and_then(|s| s.phase);
            if phase.as_deref() != Some(NAMESPACE_ACTIVE) {
                debug!(namespace = %ns.name, phase = ?phase, "namespace not active yet");
                unready.push(ns.name.clone());
            }
        }

        if !collided.is_empty() {
            status::report_collided_namespaces(addon, &collided);
            return Ok(PhaseResult::Stop);
        }
        if !unready.is_empty() {
            status::report_unready_namespaces(addon, &unready);
            return Ok(PhaseResult::RetryAfter(DEFAULT_RETRY_AFTER));
        }
        Ok(PhaseResult::Continue)
    }
}
