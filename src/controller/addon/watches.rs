//! # Watches
//!
//! Builds the Addon [`Controller`] and routes events of subordinate resources
//! back to the Addon that caused them:
//!
//! - Namespaces, AddonInstances, OperatorGroups, CatalogSources, Subscriptions
//!   and ServiceMonitors through their controlling Addon owner reference
//! - Secrets through any Addon owner reference (source secrets are referenced
//!   by every Addon that propagates them)
//! - ClusterServiceVersions through the [`CsvEventHandler`] index
//! - administrative sweeps through the requeue queue

use crate::config::OperatorConfig;
use crate::controller::addon::csv_handler::CsvEventHandler;
use crate::controller::addon::requeue::RequeueReceiver;
use crate::crd::external;
use crate::crd::{Addon, AddonInstance};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::api::{Api, DynamicObject};
use kube::runtime::reflector::ObjectRef;
use kube::{Client, Resource};
use kube_runtime::{controller, watcher, Controller};
use std::sync::Arc;

/// Addons referenced by the owner references of `obj`
///
/// With `controller_only` set, only the controlling owner reference counts.
pub fn addons_owning<K: Resource>(obj: &K, controller_only: bool) -> Vec<ObjectRef<Addon>> {
    let api_version = Addon::api_version(&());
    let kind = Addon::kind(&());
    obj.meta()
        .owner_references
        .iter()
        .flatten()
        .filter(|owner| owner.kind == kind && owner.api_version == api_version)
        .filter(|owner| !controller_only || owner.controller == Some(true))
        .map(|owner| ObjectRef::new(&owner.name))
        .collect()
}

/// Build the Addon controller with every watch registered
pub fn addon_controller(
    client: &Client,
    csv_handler: Arc<CsvEventHandler>,
    requeue: RequeueReceiver,
    config: &OperatorConfig,
) -> Controller<Addon> {
    let wc = watcher::Config::default();
    let addons: Api<Addon> = Api::all(client.clone());

    let mut controller = Controller::new(addons, wc.clone().any_semantic())
        .with_config(
            controller::Config::default().concurrency(config.max_concurrent_reconciliations),
        )
        .watches(Api::<Namespace>::all(client.clone()), wc.clone(), |ns| {
            addons_owning(&ns, true)
        })
        .watches(
            Api::<AddonInstance>::all(client.clone()),
            wc.clone(),
            |instance| addons_owning(&instance, true),
        )
        .watches(
            Api::<Secret>::namespaced(client.clone(), &config.operator_namespace),
            wc.clone(),
            |secret| addons_owning(&secret, false),
        );

    for ar in [
        external::operator_group(),
        external::catalog_source(),
        external::subscription(),
        external::service_monitor(),
    ] {
        controller = controller.watches_with(
            Api::<DynamicObject>::all_with(client.clone(), &ar),
            ar,
            wc.clone(),
            |obj| addons_owning(&obj, true),
        );
    }

    let csv_ar = external::cluster_service_version();
    controller
        .watches_with(
            Api::<DynamicObject>::all_with(client.clone(), &csv_ar),
            csv_ar,
            wc,
            move |csv| csv_handler.map_csv(&csv),
        )
        .reconcile_on(requeue.into_stream())
}
