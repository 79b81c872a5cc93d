//! # Addon Status
//!
//! Status types for tracking reconciliation state and upgrade-policy reporting.

use crate::crd::conditions::Condition;
use serde::{Deserialize, Serialize};

/// Status of the Addon resource
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonStatus {
    /// The most recent generation observed by the operator
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Conditions is a list of status conditions this object is in
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Human readable status, derived from the conditions
    #[serde(default)]
    pub phase: Option<AddonPhase>,
    /// Last upgrade-policy state reported to OCM
    #[serde(default)]
    pub upgrade_policy: Option<AddonUpgradePolicyStatus>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
pub enum AddonPhase {
    Pending,
    Ready,
    Terminating,
    Error,
}

impl AddonPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddonPhase::Pending => "Pending",
            AddonPhase::Ready => "Ready",
            AddonPhase::Terminating => "Terminating",
            AddonPhase::Error => "Error",
        }
    }
}

/// Tracks the last reported status of an upgrade policy
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonUpgradePolicyStatus {
    /// Upgrade policy id
    pub id: String,
    /// Last value reported to OCM
    pub value: AddonUpgradePolicyValue,
    /// Addon version the value was reported for
    #[serde(default)]
    pub version: Option<String>,
    /// Addon generation the value was reported for
    #[serde(default)]
    pub observed_generation: i64,
}

/// Upgrade-policy states understood by OCM
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AddonUpgradePolicyValue {
    Started,
    Completed,
}

impl AddonUpgradePolicyValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddonUpgradePolicyValue::Started => "started",
            AddonUpgradePolicyValue::Completed => "completed",
        }
    }
}

impl AddonUpgradePolicyStatus {
    /// Whether this record already covers the given policy id and version
    pub fn is_completed_for(&self, id: &str, version: Option<&str>) -> bool {
        self.id == id
            && self.value == AddonUpgradePolicyValue::Completed
            && self.version.as_deref() == version
    }
}
