//! # Conditions
//!
//! Status conditions shared by `Addon` and `AddonOperator`.
//!
//! A condition list holds at most one entry per `type`. Setting a condition
//! replaces the entry of the same type; `lastTransitionTime` only moves when
//! the status value actually changes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition type reporting whether the Addon is installed and ready
pub const AVAILABLE: &str = "Available";
/// Condition type reporting that reconciliation is paused
pub const PAUSED: &str = "Paused";

pub mod reason {
    pub const FULLY_RECONCILED: &str = "FullyReconciled";
    pub const ADDON_OPERATOR_PAUSED: &str = "AddonOperatorPaused";
    pub const ADDON_PAUSED: &str = "AddonPaused";
    pub const UNREADY_CSV: &str = "UnreadyCSV";
    pub const UNREADY_NAMESPACES: &str = "UnreadyNamespaces";
    pub const COLLIDED_NAMESPACES: &str = "CollidedNamespaces";
    pub const MISSING_SECRET_SOURCE: &str = "MissingSecretSource";
    pub const TERMINATING: &str = "Terminating";
    pub const OCM_CLIENT_UNAVAILABLE: &str = "OCMClientUnavailable";
    pub const ADDON_OPERATOR_READY: &str = "AddonOperatorReady";
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,
    /// Machine readable reason for the last transition
    #[serde(default)]
    pub reason: String,
    /// Human readable message
    #[serde(default)]
    pub message: String,
    /// Generation of the object the condition was computed for
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Last transition time (RFC3339)
    #[serde(default)]
    pub last_transition_time: Option<String>,
}

impl Condition {
    pub fn new(
        r#type: &str,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            r#type: r#type.to_string(),
            status,
            reason: reason.to_string(),
            message: message.into(),
            observed_generation: None,
            last_transition_time: None,
        }
    }

    #[must_use]
    pub fn with_generation(mut self, generation: Option<i64>) -> Self {
        self.observed_generation = generation;
        self
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Insert or replace the condition with the same type
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions
        .iter_mut()
        .find(|existing| existing.r#type == condition.r#type)
    {
        Some(existing) => {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time.clone();
            }
            if condition.last_transition_time.is_none() {
                condition.last_transition_time = Some(now_rfc3339());
            }
            *existing = condition;
        }
        None => {
            if condition.last_transition_time.is_none() {
                condition.last_transition_time = Some(now_rfc3339());
            }
            conditions.push(condition);
        }
    }
}

/// Remove the condition of the given type; returns whether one was present
pub fn remove_condition(conditions: &mut Vec<Condition>, r#type: &str) -> bool {
    let before = conditions.len();
    conditions.retain(|c| c.r#type != r#type);
    conditions.len() != before
}

pub fn find_condition<'a>(conditions: &'a [Condition], r#type: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == r#type)
}

pub fn is_condition_true(conditions: &[Condition], r#type: &str) -> bool {
    find_condition(conditions, r#type).is_some_and(Condition::is_true)
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
