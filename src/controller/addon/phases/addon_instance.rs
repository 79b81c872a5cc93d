use super::{addon_labels, controller_owner_ref, Phase, PhaseContext, PhaseResult};
use crate::constants::{ADDON_INSTANCE_NAME, DEFAULT_ADDON_INSTANCE_HEARTBEAT_PERIOD};
use crate::crd::{Addon, AddonInstance, AddonInstanceSpec};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use kube::api::Api;

/// Creates the `AddonInstance` the installed operator heartbeats into
#[derive(Debug)]
pub struct AddonInstancePhase {
    ctx: PhaseContext,
}

impl AddonInstancePhase {
    pub fn new(ctx: PhaseContext) -> Self {
        Self { ctx }
    }
}

fn desired_addon_instance(addon: &Addon, namespace: &str) -> Result<AddonInstance> {
    let mut instance = AddonInstance::new(
        ADDON_INSTANCE_NAME,
        AddonInstanceSpec {
            heartbeat_update_period: Some(DEFAULT_ADDON_INSTANCE_HEARTBEAT_PERIOD.to_string()),
        },
    );
    instance.metadata.namespace = Some(namespace.to_string());
    instance.metadata.labels = Some(addon_labels(addon));
    instance.metadata.owner_references = Some(vec![controller_owner_ref(addon)?]);
    Ok(instance)
}

#[async_trait]
impl Phase for AddonInstancePhase {
    fn name(&self) -> &'static str {
        "ensure addon instance"
    }

    async fn reconcile(&self, addon: &mut Addon) -> Result<PhaseResult> {
        let namespace = addon
            .olm_install()
            .map(|olm| olm.namespace.clone())
            .ok_or_else(|| anyhow!("install namespace is not configured"))?;

        let api: Api<AddonInstance> = Api::namespaced(self.ctx.client(), &namespace);
        self.ctx
            .apply(&api, &desired_addon_instance(addon, &namespace)?)
            .await?;
        Ok(PhaseResult::Continue)
    }
}
