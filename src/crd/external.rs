//! # External Kinds
//!
//! OLM and Prometheus Operator kinds the Addon pipeline creates or observes.
//! They have no generated Rust types, so they are handled as
//! [`DynamicObject`](kube::api::DynamicObject)s through these API resources.

use kube::api::{ApiResource, GroupVersionKind};

pub const OLM_GROUP: &str = "operators.coreos.com";
pub const MONITORING_GROUP: &str = "monitoring.coreos.com";

pub fn operator_group() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(OLM_GROUP, "v1", "OperatorGroup"),
        "operatorgroups",
    )
}

pub fn catalog_source() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(OLM_GROUP, "v1alpha1", "CatalogSource"),
        "catalogsources",
    )
}

pub fn subscription() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(OLM_GROUP, "v1alpha1", "Subscription"),
        "subscriptions",
    )
}

pub fn cluster_service_version() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(OLM_GROUP, "v1alpha1", "ClusterServiceVersion"),
        "clusterserviceversions",
    )
}

pub fn service_monitor() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(MONITORING_GROUP, "v1", "ServiceMonitor"),
        "servicemonitors",
    )
}

/// CSV phases reported in `status.phase`
pub mod csv_phase {
    pub const PENDING: &str = "Pending";
    pub const SUCCEEDED: &str = "Succeeded";
    pub const FAILED: &str = "Failed";
}
