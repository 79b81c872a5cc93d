use super::{addon_labels, controller_owner_ref, Phase, PhaseContext, PhaseResult};
use crate::constants::DEFAULT_RETRY_AFTER;
use crate::controller::addon::csv_handler::{CsvEventHandler, CsvKey};
use crate::controller::addon::status;
use crate::crd::external::{self, csv_phase};
use crate::crd::{Addon, AddonInstallOlmCommon, AddonInstallType};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Api, ApiResource, DynamicObject};
use kube::ResourceExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const OPERATOR_GROUP_NAME: &str = "redhat-layered-product-og";
const CATALOG_PUBLISHER: &str = "OSD Red Hat Addons";

/// Installs the Addon operator through OLM and waits for its CSV to succeed
#[derive(Debug)]
pub struct OlmPhase {
    ctx: PhaseContext,
    csv_handler: Arc<CsvEventHandler>,
}

impl OlmPhase {
    pub fn new(ctx: PhaseContext, csv_handler: Arc<CsvEventHandler>) -> Self {
        Self { ctx, csv_handler }
    }

    fn owned_object(
        ar: &ApiResource,
        name: &str,
        namespace: &str,
        addon: &Addon,
        owner: &OwnerReference,
        spec: Value,
    ) -> DynamicObject {
        let mut obj = DynamicObject::new(name, ar)
            .within(namespace)
            .data(json!({ "spec": spec }));
        obj.metadata.labels = Some(addon_labels(addon));
        obj.metadata.owner_references = Some(vec![owner.clone()]);
        obj
    }

    async fn apply_dynamic(&self, ar: &ApiResource, obj: &DynamicObject) -> Result<DynamicObject> {
        let namespace = obj.namespace().unwrap_or_default();
        let api: Api<DynamicObject> = Api::namespaced_with(self.ctx.client(), &namespace, ar);
        self.ctx.apply(&api, obj).await
    }
}

pub(crate) fn catalog_source_name(addon: &Addon) -> String {
    format!("addon-{}-catalog", addon.name_any())
}

fn catalog_source_spec(addon: &Addon, olm: &AddonInstallOlmCommon) -> Value {
    let mut spec = json!({
        "sourceType": "grpc",
        "image": olm.catalog_source_image,
        "displayName": addon.spec.display_name,
        "publisher": CATALOG_PUBLISHER,
    });
    if let Some(pull_secret) = &olm.pull_secret_name {
        spec["secrets"] = json!([pull_secret]);
    }
    spec
}

fn operator_group_spec(addon: &Addon, olm: &AddonInstallOlmCommon) -> Value {
    match addon.spec.install.r#type {
        AddonInstallType::OlmOwnNamespace => json!({ "targetNamespaces": [olm.namespace] }),
        AddonInstallType::OlmAllNamespaces => json!({}),
    }
}

fn subscription_spec(addon: &Addon, olm: &AddonInstallOlmCommon) -> Value {
    let mut spec = json!({
        "channel": olm.channel,
        "name": olm.package_name,
        "source": catalog_source_name(addon),
        "sourceNamespace": olm.namespace,
    });
    if let Some(config) = &olm.config {
        spec["config"] = json!({ "env": config.env });
    }
    spec
}

/// Map the observed CSV phase to a pipeline result, updating the Addon conditions
///
/// `phase` is `None` when the CSV does not exist (yet) or reports no phase.
pub fn observe_current_csv(addon: &mut Addon, phase: Option<&str>) -> PhaseResult {
    let message = match phase {
        Some(csv_phase::SUCCEEDED) => return PhaseResult::Continue,
        None | Some("" | csv_phase::PENDING) => "unkown/pending".to_string(),
        Some(csv_phase::FAILED) => "failed".to_string(),
        Some(other) => other.to_lowercase(),
    };
    status::report_unready_csv(addon, &message);
    PhaseResult::RetryAfter(DEFAULT_RETRY_AFTER)
}

#[async_trait]
impl Phase for OlmPhase {
    fn name(&self) -> &'static str {
        "ensure OLM installation"
    }

    async fn reconcile(&self, addon: &mut Addon) -> Result<PhaseResult> {
        let olm = addon
            .olm_install()
            .cloned()
            .ok_or_else(|| anyhow!("install spec for type {:?} is missing", addon.spec.install.r#type))?;
        let owner = controller_owner_ref(addon)?;
        let ns = olm.namespace.as_str();

        let catalog_ar = external::catalog_source();
        let catalog = Self::owned_object(
            &catalog_ar,
            &catalog_source_name(addon),
            ns,
            addon,
            &owner,
            catalog_source_spec(addon, &olm),
        );
        self.apply_dynamic(&catalog_ar, &catalog).await?;

        let og_ar = external::operator_group();
        let operator_group = Self::owned_object(
            &og_ar,
            OPERATOR_GROUP_NAME,
            ns,
            addon,
            &owner,
            operator_group_spec(addon, &olm),
        );
        self.apply_dynamic(&og_ar, &operator_group).await?;

        let sub_ar = external::subscription();
        let subscription = Self::owned_object(
            &sub_ar,
            &format!("addon-{}", addon.name_any()),
            ns,
            addon,
            &owner,
            subscription_spec(addon, &olm),
        );
        let applied = self.apply_dynamic(&sub_ar, &subscription).await?;

        let current_csv = applied
            .data
            .pointer("/status/currentCSV")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if current_csv.is_empty() {
            debug!(subscription = %applied.name_any(), "subscription has no current CSV yet");
            return Ok(PhaseResult::RetryAfter(DEFAULT_RETRY_AFTER));
        }

        if self
            .csv_handler
            .replace_map(&addon.identity(), [CsvKey::new(ns, current_csv.clone())])
        {
            debug!(csv = %current_csv, "tracking new CSV for addon");
        }

        let csv_ar = external::cluster_service_version();
        let csv_api: Api<DynamicObject> = Api::namespaced_with(self.ctx.client(), ns, &csv_ar);
        let csv = self
            .ctx
            .bounded(&format!("get CSV {current_csv}"), csv_api.get_opt(&current_csv))
            .await?;
        let phase = csv
            .as_ref()
            .and_then(|csv| csv.data.pointer("/status/phase"))
            .and_then(Value::as_str);

        Ok(observe_current_csv(addon, phase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::conditions::{self, find_condition, reason, ConditionStatus};
    use crate::crd::{AddonInstallSpec, AddonSpec};

    fn available_message(addon: &Addon) -> Option<String> {
        find_condition(addon.conditions(), conditions::AVAILABLE).map(|c| {
            assert_eq!(c.status, ConditionStatus::False);
            assert_eq!(c.reason, reason::UNREADY_CSV);
            c.message.clone()
        })
    }

    #[test]
    fn test_no_csv_present() {
        let mut addon = Addon::new("a", AddonSpec::default());
        let result = observe_current_csv(&mut addon, None);
        assert_eq!(result, PhaseResult::RetryAfter(DEFAULT_RETRY_AFTER));
        assert_eq!(
            available_message(&addon).as_deref(),
            Some("ClusterServiceVersion is not ready: unkown/pending")
        );
    }

    #[test]
    fn test_phase_failed() {
        let mut addon = Addon::new("a", AddonSpec::default());
        let result = observe_current_csv(&mut addon, Some(csv_phase::FAILED));
        assert_eq!(result, PhaseResult::RetryAfter(DEFAULT_RETRY_AFTER));
        assert_eq!(
            available_message(&addon).as_deref(),
            Some("ClusterServiceVersion is not ready: failed")
        );
    }

    #[test]
    fn test_phase_succeeded() {
        let mut addon = Addon::new("a", AddonSpec::default());
        let result = observe_current_csv(&mut addon, Some(csv_phase::SUCCEEDED));
        assert_eq!(result, PhaseResult::Continue);
        assert!(addon.conditions().is_empty());
    }

    #[test]
    fn test_other_phase_is_reported_by_name() {
        let mut addon = Addon::new("a", AddonSpec::default());
        observe_current_csv(&mut addon, Some("Installing"));
        assert_eq!(
            available_message(&addon).as_deref(),
            Some("ClusterServiceVersion is not ready: installing")
        );
    }

    #[test]
    fn test_subscription_and_operator_group_specs() {
        let olm = AddonInstallOlmCommon {
            namespace: "addon-ns".to_string(),
            catalog_source_image: "quay.io/addon/catalog:v1".to_string(),
            channel: "stable".to_string(),
            package_name: "addon-pkg".to_string(),
            pull_secret_name: Some("pull".to_string()),
            config: None,
        };
        let addon = Addon::new(
            "my-addon",
            AddonSpec {
                install: AddonInstallSpec {
                    r#type: AddonInstallType::OlmOwnNamespace,
                    olm_own_namespace: Some(olm.clone()),
                    olm_all_namespaces: None,
                },
                ..AddonSpec::default()
            },
        );

        let sub = subscription_spec(&addon, &olm);
        assert_eq!(sub["source"], "addon-my-addon-catalog");
        assert_eq!(sub["sourceNamespace"], "addon-ns");
        assert!(sub.get("config").is_none());

        assert_eq!(
            operator_group_spec(&addon, &olm),
            json!({ "targetNamespaces": ["addon-ns"] })
        );
        assert_eq!(catalog_source_spec(&addon, &olm)["secrets"], json!(["pull"]));
    }
}
