//! # AddonInstance
//!
//! Bookkeeping object created in each Addon install namespace. The installed
//! operator heartbeats into its status.

use crate::crd::conditions::Condition;
use serde::{Deserialize, Serialize};

#[derive(
    kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "AddonInstance",
    group = "addons.managed.openshift.io",
    version = "v1alpha1",
    namespaced,
    status = "AddonInstanceStatus",
    printcolumn = r#"{"name":"Last Heartbeat", "type":"string", "jsonPath":".status.lastHeartbeatTime"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AddonInstanceSpec {
    /// How often the installed operator is expected to heartbeat (e.g. "10s")
    #[serde(default)]
    pub heartbeat_update_period: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonInstanceStatus {
    #[serde(default)]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub last_heartbeat_time: Option<String>,
}
