//! # Addon Spec
//!
//! The cluster-scoped `Addon` resource and its helper accessors.

use crate::crd::conditions::Condition;
use crate::crd::AddonStatus;
use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Addon Custom Resource Definition
///
/// An Addon describes an operator that should be installed onto the cluster
/// through OLM, together with the namespaces, pull secrets and monitoring
/// federation it needs.
///
/// # Example
///
/// ```yaml
/// apiVersion: addons.managed.openshift.io/v1alpha1
/// kind: Addon
/// metadata:
///   name: reference-addon
/// spec:
///   displayName: Reference Addon
///   namespaces:
///     - name: reference-addon
///   install:
///     type: OLMOwnNamespace
///     olmOwnNamespace:
///       namespace: reference-addon
///       packageName: reference-addon
///       channel: alpha
///       catalogSourceImage: quay.io/osd-addons/reference-addon-index:latest
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "Addon",
    group = "addons.managed.openshift.io",
    version = "v1alpha1",
    status = "AddonStatus",
    shortname = "addon",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.phase"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AddonSpec {
    /// Human readable name for this addon
    pub display_name: String,
    /// Version of the Addon being deployed
    #[serde(default)]
    pub version: Option<String>,
    /// Pausing reconciliation of this Addon
    #[serde(default)]
    pub paused: bool,
    /// Namespaces the Addon operator owns
    #[serde(default)]
    pub namespaces: Vec<AddonNamespace>,
    /// How the Addon operator is installed through OLM
    pub install: AddonInstallSpec,
    /// Monitoring federation settings
    #[serde(default)]
    pub monitoring: Option<MonitoringSpec>,
    /// Pull secrets copied from the operator namespace into every Addon namespace
    #[serde(default)]
    pub secret_propagation: Option<AddonSecretPropagation>,
    /// Upgrade policy to report status for
    #[serde(default)]
    pub upgrade_policy: Option<AddonUpgradePolicy>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonNamespace {
    pub name: String,
}

/// Install strategy of an Addon
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema,
)]
pub enum AddonInstallType {
    /// Operator watches only its own namespace
    #[default]
    #[serde(rename = "OLMOwnNamespace")]
    OlmOwnNamespace,
    /// Operator watches all namespaces
    #[serde(rename = "OLMAllNamespaces")]
    OlmAllNamespaces,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonInstallSpec {
    pub r#type: AddonInstallType,
    /// Settings for `OLMOwnNamespace` installs
    #[serde(default, rename = "olmOwnNamespace")]
    pub olm_own_namespace: Option<AddonInstallOlmCommon>,
    /// Settings for `OLMAllNamespaces` installs
    #[serde(default, rename = "olmAllNamespaces")]
    pub olm_all_namespaces: Option<AddonInstallOlmCommon>,
}

/// Settings shared by both OLM install strategies
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonInstallOlmCommon {
    /// Namespace to install the Addon operator into
    pub namespace: String,
    /// Image of the CatalogSource index
    pub catalog_source_image: String,
    /// Channel of the package to subscribe to
    pub channel: String,
    /// Name of the package to install
    pub package_name: String,
    /// Secret used to pull the catalog source image
    #[serde(default)]
    pub pull_secret_name: Option<String>,
    /// Extra configuration passed to the Subscription
    #[serde(default)]
    pub config: Option<SubscriptionConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionConfig {
    #[serde(default)]
    pub env: Vec<EnvObject>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvObject {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringSpec {
    #[serde(default)]
    pub federation: Option<MonitoringFederationSpec>,
}

/// Federation of metrics from the Addon's own Prometheus
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringFederationSpec {
    /// Namespace the Addon's Prometheus runs in
    pub namespace: String,
    /// Metric names to federate
    pub match_names: Vec<String>,
    /// Labels selecting the Addon's Prometheus service
    pub match_labels: BTreeMap<String, String>,
    /// Name of the service port serving `/federate`
    pub port_name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonSecretPropagation {
    pub secrets: Vec<AddonSecretPropagationReference>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonSecretPropagationReference {
    /// Secret in the operator namespace to copy from
    pub source_secret: SecretReference,
    /// Secret name in each Addon namespace to copy to
    pub destination_secret: SecretReference,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonUpgradePolicy {
    /// Upgrade policy id as known to OCM
    pub id: String,
}

impl Addon {
    /// Identity used by the scheduler and the requeue queue
    pub fn identity(&self) -> ObjectRef<Self> {
        ObjectRef::from_obj(self)
    }

    pub fn is_deletion_requested(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Stable key for per-Addon metric state: the UID, or the name for objects without one
    pub fn metrics_key(&self) -> String {
        self.metadata.uid.clone().unwrap_or_else(|| self.name_any())
    }

    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map_or(&[], |status| status.conditions.as_slice())
    }

    pub fn status_mut(&mut self) -> &mut AddonStatus {
        self.status.get_or_insert_with(AddonStatus::default)
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers().iter().any(|f| f == finalizer)
    }

    /// Returns true when the finalizer was missing and has been added
    pub fn add_finalizer(&mut self, finalizer: &str) -> bool {
        if self.has_finalizer(finalizer) {
            return false;
        }
        self.finalizers_mut().push(finalizer.to_string());
        true
    }

    /// Returns true when the finalizer was present and has been removed
    pub fn remove_finalizer(&mut self, finalizer: &str) -> bool {
        let finalizers = self.finalizers_mut();
        let before = finalizers.len();
        finalizers.retain(|f| f != finalizer);
        finalizers.len() != before
    }

    /// OLM settings for the configured install type
    pub fn olm_install(&self) -> Option<&AddonInstallOlmCommon> {
        match self.spec.install.r#type {
            AddonInstallType::OlmOwnNamespace => self.spec.install.olm_own_namespace.as_ref(),
            AddonInstallType::OlmAllNamespaces => self.spec.install.olm_all_namespaces.as_ref(),
        }
    }

    pub fn federation(&self) -> Option<&MonitoringFederationSpec> {
        self.spec
            .monitoring
            .as_ref()
            .and_then(|monitoring| monitoring.federation.as_ref())
    }
}
