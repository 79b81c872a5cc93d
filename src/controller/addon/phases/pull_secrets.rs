use super::{addon_labels, controller_owner_ref, Phase, PhaseContext, PhaseResult};
use crate::constants::DEFAULT_RETRY_AFTER;
use crate::controller::addon::status;
use crate::crd::Addon;
use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::api::{Api, Patch, PatchParams};
use kube::ResourceExt;
use serde_json::json;
use tracing::debug;

/// Copies pull secrets from the operator namespace into every Addon namespace
///
/// The source secret gets a non-controller owner reference to each Addon that
/// propagates it, which routes Secret events back to those Addons.
#[derive(Debug)]
pub struct PullSecretPropagationPhase {
    ctx: PhaseContext,
    operator_namespace: String,
}

impl PullSecretPropagationPhase {
    pub fn new(ctx: PhaseContext, operator_namespace: String) -> Self {
        Self {
            ctx,
            operator_namespace,
        }
    }

    /// Add `owner` (as a plain owner) to the source secret if missing
    async fn reference_source(
        &self,
        api: &Api<Secret>,
        source: &Secret,
        owner: &OwnerReference,
    ) -> Result<()> {
        let mut owners = source.owner_references().to_vec();
        if owners.iter().any(|o| o.uid == owner.uid) {
            return Ok(());
        }
        owners.push(OwnerReference {
            controller: None,
            block_owner_deletion: None,
            ..owner.clone()
        });

        // The full list plus resourceVersion keeps other Addons' references intact
        let patch = json!({
            "metadata": {
                "ownerReferences": owners,
                "resourceVersion": source.resource_version(),
            }
        });
        let name = source.name_any();
        self.ctx
            .bounded(
                &format!("reference source secret {name}"),
                api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch)),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Phase for PullSecretPropagationPhase {
    fn name(&self) -> &'static str {
        "propagate pull secrets"
    }

    async fn reconcile(&self, addon: &mut Addon) -> Result<PhaseResult> {
        let Some(propagation) = addon.spec.secret_propagation.clone() else {
            return Ok(PhaseResult::Continue);
        };
        if propagation.secrets.is_empty() {
            return Ok(PhaseResult::Continue);
        }

        let owner = controller_owner_ref(addon)?;
        let source_api: Api<Secret> = Api::namespaced(self.ctx.client(), &self.operator_namespace);

        for reference in &propagation.secrets {
            let source_name = &reference.source_secret.name;
            let source = self
                .ctx
                .bounded(
                    &format!("get source secret {source_name}"),
                    source_api.get_opt(source_name),
                )
                .await?;
            let Some(source) = source else {
                status::report_missing_secret_source(addon, source_name, &self.operator_namespace);
                return Ok(PhaseResult::RetryAfter(DEFAULT_RETRY_AFTER));
            };

            self.reference_source(&source_api, &source, &owner).await?;

            for ns in &addon.spec.namespaces {
                let api: Api<Secret> = Api::namespaced(self.ctx.client(), &ns.name);
                let desired = Secret {
                    metadata: ObjectMeta {
                        name: Some(reference.destination_secret.name.clone()),
                        namespace: Some(ns.name.clone()),
                        labels: Some(addon_labels(addon)),
                        owner_references: Some(vec![owner.clone()]),
                        ..ObjectMeta::default()
                    },
                    data: source.data.clone(),
                    type_: source.type_.clone(),
                    ..Secret::default()
                };
                self.ctx.apply(&api, &desired).await?;
                debug!(
                    secret = %reference.destination_secret.name,
                    namespace = %ns.name,
                    "propagated pull secret"
                );
            }
        }

        Ok(PhaseResult::Continue)
    }
}
