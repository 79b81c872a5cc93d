//! # Phases
//!
//! The Addon installation pipeline. Phases run in a fixed order and each one
//! decides whether the pipeline continues, stops, or retries later:
//!
//! 1. [`NamespacePhase`]: Addon namespaces
//! 2. [`PullSecretPropagationPhase`]: pull secrets copied into those namespaces
//! 3. [`AddonInstancePhase`]: the `AddonInstance` bookkeeping object
//! 4. [`OlmPhase`]: CatalogSource, OperatorGroup, Subscription and CSV readiness
//! 5. [`MonitoringFederationPhase`]: optional ServiceMonitor federation
//!
//! Phases update conditions on the in-memory Addon; the reconciler persists
//! the status afterwards.

mod addon_instance;
mod monitoring;
mod namespace;
mod olm;
mod pull_secrets;

pub use addon_instance::AddonInstancePhase;
pub use monitoring::MonitoringFederationPhase;
pub use namespace::NamespacePhase;
pub use olm::{observe_current_csv, OlmPhase};
pub use pull_secrets::PullSecretPropagationPhase;

use crate::config::OperatorConfig;
use crate::constants::{ADDON_NAME_LABEL, FIELD_MANAGER};
use crate::controller::addon::csv_handler::CsvEventHandler;
use crate::crd::Addon;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a single phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseResult {
    /// Run the next phase
    Continue,
    /// Stop the pipeline without requeueing
    Stop,
    /// Stop the pipeline and reconcile again after the delay
    RetryAfter(Duration),
}

#[async_trait]
pub trait Phase: Send + Sync {
    /// Name used in logs and in wrapped errors
    fn name(&self) -> &'static str;

    async fn reconcile(&self, addon: &mut Addon) -> Result<PhaseResult>;
}

/// Build the installation pipeline in execution order
pub fn default_phases(
    client: &Client,
    csv_handler: Arc<CsvEventHandler>,
    config: &OperatorConfig,
) -> Vec<Box<dyn Phase>> {
    let ctx = PhaseContext::new(client.clone(), config.api_timeout());
    vec![
        Box::new(NamespacePhase::new(ctx.clone())),
        Box::new(PullSecretPropagationPhase::new(
            ctx.clone(),
            config.operator_namespace.clone(),
        )),
        Box::new(AddonInstancePhase::new(ctx.clone())),
        Box::new(OlmPhase::new(ctx.clone(), csv_handler)),
        Box::new(MonitoringFederationPhase::new(ctx)),
    ]
}

/// Shared plumbing for phases that talk to the API server
#[derive(Clone)]
pub struct PhaseContext {
    client: Client,
    timeout: Duration,
}

impl Debug for PhaseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseContext")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl PhaseContext {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Run an API call bounded by the configured timeout
    pub async fn bounded<T>(
        &self,
        what: &str,
        call: impl Future<Output = Result<T, kube::Error>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.with_context(|| format!("failed to {what}")),
            Err(_elapsed) => Err(anyhow!("timed out after {:?} trying to {what}", self.timeout)),
        }
    }

    /// Server-side apply `obj`, taking ownership of conflicting fields
    pub async fn apply<K>(&self, api: &Api<K>, obj: &K) -> Result<K>
    where
        K: Resource + Clone + Debug + Serialize + DeserializeOwned,
    {
        let name = obj.name_any();
        self.bounded(
            &format!("apply {name}"),
            api.patch(
                &name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(obj),
            ),
        )
        .await
    }
}

/// Controller owner reference pointing at `addon`
pub fn controller_owner_ref(addon: &Addon) -> Result<OwnerReference> {
    addon
        .controller_owner_ref(&())
        .ok_or_else(|| anyhow!("addon {} has no uid yet", addon.name_any()))
}

/// Whether `obj` is controlled by the Addon with uid `uid`
pub fn is_controlled_by<K: Resource>(obj: &K, uid: &str) -> bool {
    obj.owner_references()
        .iter()
        .any(|owner| owner.controller == Some(true) && owner.uid == uid)
}

/// Common labels for every object created on behalf of `addon`
pub fn addon_labels(addon: &Addon) -> BTreeMap<String, String> {
    BTreeMap::from([(ADDON_NAME_LABEL.to_string(), addon.name_any())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::AddonSpec;
    use k8s_openapi::api::core::v1::Namespace;

    fn addon_with_uid() -> Addon {
        let mut addon = Addon::new("my-addon", AddonSpec::default());
        addon.metadata.uid = Some("uid-1".to_string());
        addon
    }

    #[test]
    fn test_controller_owner_ref() {
        let owner = controller_owner_ref(&addon_with_uid()).unwrap();
        assert_eq!(owner.kind, "Addon");
        assert_eq!(owner.uid, "uid-1");
        assert_eq!(owner.controller, Some(true));

        assert!(controller_owner_ref(&Addon::new("x", AddonSpec::default())).is_err());
    }

    #[test]
    fn test_is_controlled_by() {
        let owner = controller_owner_ref(&addon_with_uid()).unwrap();
        let mut ns = Namespace::default();
        assert!(!is_controlled_by(&ns, "uid-1"));

        ns.metadata.owner_references = Some(vec![owner.clone()]);
        assert!(is_controlled_by(&ns, "uid-1"));
        assert!(!is_controlled_by(&ns, "uid-2"));

        ns.metadata.owner_references = Some(vec![OwnerReference {
            controller: None,
            ..owner
        }]);
        assert!(!is_controlled_by(&ns, "uid-1"));
    }

    #[test]
    fn test_addon_labels() {
        let labels = addon_labels(&addon_with_uid());
        assert_eq!(labels.get(ADDON_NAME_LABEL).map(String::as_str), Some("my-addon"));
    }
}
