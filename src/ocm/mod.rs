//! # OCM
//!
//! Client contract for the OCM upgrade-policy service.
//!
//! The reconciler only depends on the [`OcmClient`] trait; the HTTP
//! implementation lives in [`client`]. Any failure is surfaced to the caller
//! as an [`OcmError`] and becomes a reconcile error.

pub mod client;

pub use client::OcmHttpClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcmError {
    #[error("OCM request {method} {path} failed: {source}")]
    Request {
        method: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("OCM returned {status} for {method} {path}: {body}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },
    #[error("cluster with external id '{0}' not found in OCM")]
    ClusterNotFound(String),
    #[error("OCM request timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid OCM client configuration: {0}")]
    Config(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterGetRequest {
    pub cluster_external_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClusterGetResponse {
    pub id: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub display_name: String,
}

/// Upgrade-policy states understood by OCM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradePolicyValue {
    Scheduled,
    Started,
    Delayed,
    Cancelled,
    Completed,
}

impl From<crate::crd::AddonUpgradePolicyValue> for UpgradePolicyValue {
    fn from(value: crate::crd::AddonUpgradePolicyValue) -> Self {
        match value {
            crate::crd::AddonUpgradePolicyValue::Started => UpgradePolicyValue::Started,
            crate::crd::AddonUpgradePolicyValue::Completed => UpgradePolicyValue::Completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradePolicyPatchRequest {
    #[serde(skip)]
    pub id: String,
    pub value: UpgradePolicyValue,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpgradePolicyPatchResponse {
    #[serde(default)]
    pub value: Option<UpgradePolicyValue>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradePolicyGetRequest {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpgradePolicyGetResponse {
    #[serde(default)]
    pub value: Option<UpgradePolicyValue>,
    #[serde(default)]
    pub description: String,
}

/// Upgrade-policy service consumed by the Addon reconciler
#[async_trait]
pub trait OcmClient: Send + Sync + std::fmt::Debug {
    /// Look up a cluster by its external id
    async fn get_cluster(&self, req: ClusterGetRequest) -> Result<ClusterGetResponse, OcmError>;

    /// Set the state of an upgrade policy
    async fn patch_upgrade_policy(
        &self,
        req: UpgradePolicyPatchRequest,
    ) -> Result<UpgradePolicyPatchResponse, OcmError>;

    /// Read the state of an upgrade policy
    async fn get_upgrade_policy(
        &self,
        req: UpgradePolicyGetRequest,
    ) -> Result<UpgradePolicyGetResponse, OcmError>;
}
