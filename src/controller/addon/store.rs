//! # Addon Store
//!
//! Access to Addon objects for the reconciler. Reads go to the API server
//! rather than the watch cache so a reconcile always starts from the latest
//! version. Every call is bounded by the configured API timeout.

use crate::constants::FIELD_MANAGER;
use crate::crd::Addon;
use async_trait::async_trait;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("addon '{0}' not found")]
    NotFound(String),
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("kubernetes API call timed out after {0:?}")]
    Timeout(Duration),
}

/// Read and write operations the reconciler needs on Addons
#[async_trait]
pub trait AddonStore: Send + Sync {
    /// Fetch an Addon; `Ok(None)` when it no longer exists
    async fn get(&self, name: &str) -> Result<Option<Addon>, StoreError>;

    /// All Addons currently known to the cluster
    async fn list(&self) -> Result<Vec<Addon>, StoreError>;

    /// Persist `metadata.finalizers` and return the updated object
    async fn update_finalizers(&self, addon: &Addon) -> Result<Addon, StoreError>;

    /// Persist the status subresource
    async fn update_status(&self, addon: &Addon) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct KubeAddonStore {
    api: Api<Addon>,
    timeout: Duration,
}

impl std::fmt::Debug for KubeAddonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeAddonStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl KubeAddonStore {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self {
            api: Api::all(client),
            timeout,
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, kube::Error>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_elapsed| StoreError::Timeout(self.timeout))?
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl AddonStore for KubeAddonStore {
    async fn get(&self, name: &str) -> Result<Option<Addon>, StoreError> {
        self.bounded(self.api.get_opt(name)).await
    }

    async fn list(&self) -> Result<Vec<Addon>, StoreError> {
        let list = self.bounded(self.api.list(&ListParams::default())).await?;
        Ok(list.items)
    }

    async fn update_finalizers(&self, addon: &Addon) -> Result<Addon, StoreError> {
        let name = addon.name_any();
        // resourceVersion makes the patch fail on a concurrent finalizer change
        let patch = json!({
            "metadata": {
                "finalizers": addon.finalizers(),
                "resourceVersion": addon.resource_version(),
            }
        });
        match self
            .bounded(
                self.api
                    .patch(&name, &PatchParams::default(), &Patch::Merge(&patch)),
            )
            .await
        {
            Err(StoreError::Kube(kube::Error::Api(e))) if e.code == 404 => {
                Err(StoreError::NotFound(name))
            }
            other => other,
        }
    }

    async fn update_status(&self, addon: &Addon) -> Result<(), StoreError> {
        let name = addon.name_any();
        let patch = json!({ "status": addon.status });
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PatchParams::default()
        };
        match self
            .bounded(self.api.patch_status(&name, &params, &Patch::Merge(&patch)))
            .await
        {
            Ok(_) => Ok(()),
            Err(StoreError::Kube(kube::Error::Api(e))) if e.code == 404 => {
                Err(StoreError::NotFound(name))
            }
            Err(e) => Err(e),
        }
    }
}
