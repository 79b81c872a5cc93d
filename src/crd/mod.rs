//! # Custom Resource Definitions
//!
//! CRD types for the Addon Operator.
//!
//! ## Module Structure
//!
//! - `addon.rs` - The cluster-scoped `Addon` resource and its spec
//! - `status.rs` - Addon status, phases and upgrade-policy reporting state
//! - `conditions.rs` - Condition type, well-known types/reasons and set/remove helpers
//! - `addon_instance.rs` - Per-install-namespace `AddonInstance` bookkeeping object
//! - `addon_operator.rs` - Singleton `AddonOperator` object carrying operator-wide settings
//! - `external.rs` - API resources for OLM and monitoring kinds that have no Rust types

mod addon;
mod addon_instance;
mod addon_operator;
pub mod conditions;
pub mod external;
mod status;

pub use addon::{
    Addon, AddonInstallOlmCommon, AddonInstallSpec, AddonInstallType, AddonNamespace,
    AddonSecretPropagation, AddonSecretPropagationReference, AddonSpec, AddonUpgradePolicy,
    EnvObject, MonitoringFederationSpec, MonitoringSpec, SecretReference, SubscriptionConfig,
};
pub use addon_instance::{AddonInstance, AddonInstanceSpec, AddonInstanceStatus};
pub use addon_operator::{
    AddonOperator, AddonOperatorOcm, AddonOperatorSpec, AddonOperatorStatus,
    ClusterSecretReference,
};
pub use conditions::{Condition, ConditionStatus};
pub use status::{AddonPhase, AddonStatus, AddonUpgradePolicyStatus, AddonUpgradePolicyValue};
