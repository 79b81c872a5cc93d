use super::{addon_labels, controller_owner_ref, Phase, PhaseContext, PhaseResult};
use crate::crd::external;
use crate::crd::{Addon, MonitoringFederationSpec};
use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::api::{Api, DynamicObject};
use kube::ResourceExt;
use serde_json::json;

/// Federates selected metrics of the Addon's Prometheus into cluster monitoring
#[derive(Debug)]
pub struct MonitoringFederationPhase {
    ctx: PhaseContext,
}

impl MonitoringFederationPhase {
    pub fn new(ctx: PhaseContext) -> Self {
        Self { ctx }
    }
}

pub(crate) fn monitoring_namespace_name(addon: &Addon) -> String {
    format!("redhat-monitoring-{}", addon.name_any())
}

fn federation_service_monitor(
    addon: &Addon,
    federation: &MonitoringFederationSpec,
    owner: &OwnerReference,
) -> DynamicObject {
    let ar = external::service_monitor();
    let match_params: Vec<String> = federation
        .match_names
        .iter()
        .map(|name| format!("{{__name__=\"{name}\"}}"))
        .collect();

    let mut monitor = DynamicObject::new(&format!("{}-federation", addon.name_any()), &ar)
        .within(&monitoring_namespace_name(addon))
        .data(json!({
            "spec": {
                "endpoints": [{
                    "honorLabels": true,
                    "port": federation.port_name,
                    "path": "/federate",
                    "scheme": "https",
                    "interval": "30s",
                    "params": { "match[]": match_params },
                }],
                "namespaceSelector": { "matchNames": [federation.namespace] },
                "selector": { "matchLabels": federation.match_labels },
            }
        }));
    monitor.metadata.labels = Some(addon_labels(addon));
    monitor.metadata.owner_references = Some(vec![owner.clone()]);
    monitor
}

#[async_trait]
impl Phase for MonitoringFederationPhase {
    fn name(&self) -> &'static str {
        "ensure monitoring federation"
    }

    async fn reconcile(&self, addon: &mut Addon) -> Result<PhaseResult> {
        let Some(federation) = addon.federation().cloned() else {
            return Ok(PhaseResult::Continue);
        };
        let owner = controller_owner_ref(addon)?;

        let ns_api: Api<Namespace> = Api::all(self.ctx.client());
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(monitoring_namespace_name(addon)),
                labels: Some(addon_labels(addon)),
                owner_references: Some(vec![owner.clone()]),
                ..ObjectMeta::default()
            },
            ..Namespace::default()
        };
        self.ctx.apply(&ns_api, &namespace).await?;

        let ar = external::service_monitor();
        let monitor = federation_service_monitor(addon, &federation, &owner);
        let sm_api: Api<DynamicObject> =
            Api::namespaced_with(self.ctx.client(), &monitoring_namespace_name(addon), &ar);
        self.ctx.apply(&sm_api, &monitor).await?;

        Ok(PhaseResult::Continue)
    }
}
