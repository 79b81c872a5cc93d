//! # AddonOperator
//!
//! Singleton resource holding operator-wide settings: the global pause switch
//! and the OCM endpoint used for upgrade-policy reporting.

use crate::crd::conditions::Condition;
use serde::{Deserialize, Serialize};

/// AddonOperator Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: addons.managed.openshift.io/v1alpha1
/// kind: AddonOperator
/// metadata:
///   name: addon-operator
/// spec:
///   paused: false
///   ocm:
///     endpoint: https://api.openshift.com
///     secret:
///       name: ocm-token
///       namespace: addon-operator
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "AddonOperator",
    group = "addons.managed.openshift.io",
    version = "v1alpha1",
    status = "AddonOperatorStatus",
    printcolumn = r#"{"name":"Paused", "type":"boolean", "jsonPath":".spec.paused"}, {"name":"Last Heartbeat", "type":"string", "jsonPath":".status.lastHeartbeatTime"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AddonOperatorSpec {
    /// Pause reconciliation of all Addons
    #[serde(default)]
    pub paused: bool,
    /// OCM connection settings; upgrade-policy reporting is disabled without them
    #[serde(default)]
    pub ocm: Option<AddonOperatorOcm>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonOperatorOcm {
    /// Root of the OCM API, e.g. `https://api.openshift.com`
    pub endpoint: String,
    /// Secret holding the OCM bearer token under the `token` key
    pub secret: ClusterSecretReference,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSecretReference {
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonOperatorStatus {
    #[serde(default)]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Last time the operator confirmed it is alive (RFC3339)
    #[serde(default)]
    pub last_heartbeat_time: Option<String>,
}
