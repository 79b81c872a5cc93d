//! # OCM HTTP Client
//!
//! JSON-over-HTTPS client for the clusters management API, authenticated with
//! a bearer token. The cluster's internal id is resolved once on connect and
//! used for every upgrade-policy call.

use crate::ocm::{
    ClusterGetRequest, ClusterGetResponse, OcmClient, OcmError, UpgradePolicyGetRequest,
    UpgradePolicyGetResponse, UpgradePolicyPatchRequest, UpgradePolicyPatchResponse,
};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const CLUSTERS_PATH: &str = "/api/clusters_mgmt/v1/clusters";

#[derive(Clone)]
pub struct OcmHttpClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    cluster_id: String,
    timeout: Duration,
}

impl std::fmt::Debug for OcmHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcmHttpClient")
            .field("endpoint", &self.endpoint)
            .field("cluster_id", &self.cluster_id)
            .field("token", &"***")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ClusterList {
    #[serde(default)]
    items: Vec<ClusterGetResponse>,
}

impl OcmHttpClient {
    /// Build a client and resolve the internal id of the cluster with `cluster_external_id`
    ///
    /// # Errors
    ///
    /// Fails when the endpoint or token is empty, the HTTP client cannot be
    /// built, or OCM does not know the cluster.
    pub async fn connect(
        endpoint: &str,
        token: &str,
        cluster_external_id: &str,
        timeout: Duration,
    ) -> Result<Self, OcmError> {
        if endpoint.is_empty() {
            return Err(OcmError::Config("endpoint must not be empty".to_string()));
        }
        if token.is_empty() {
            return Err(OcmError::Config("token must not be empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| OcmError::Request {
                method: "BUILD",
                path: endpoint.to_string(),
                source,
            })?;

        let mut client = Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
            cluster_id: String::new(),
            timeout,
        };

        let cluster = client
            .get_cluster(ClusterGetRequest {
                cluster_external_id: cluster_external_id.to_string(),
            })
            .await?;
        info!(
            ocm.endpoint = %client.endpoint,
            cluster.id = %cluster.id,
            "resolved cluster in OCM"
        );
        client.cluster_id = cluster.id;

        Ok(client)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    fn upgrade_policy_state_path(&self, policy_id: &str) -> String {
        upgrade_policy_state_path(&self.cluster_id, policy_id)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<T, OcmError> {
        let method_name = method_name(&method);
        let url = format!("{}{}", self.endpoint, path);
        debug!(method = method_name, path, "sending OCM request");

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&self.token)
            .query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|source| {
            if source.is_timeout() {
                return OcmError::Timeout(self.timeout);
            }
            OcmError::Request {
                method: method_name,
                path: path.to_string(),
                source,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcmError::Status {
                method: method_name,
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json::<T>().await.map_err(|source| OcmError::Request {
            method: method_name,
            path: path.to_string(),
            source,
        })
    }
}

#[async_trait]
impl OcmClient for OcmHttpClient {
    async fn get_cluster(&self, req: ClusterGetRequest) -> Result<ClusterGetResponse, OcmError> {
        let search = format!("external_id = '{}'", req.cluster_external_id);
        let list: ClusterList = self
            .send(Method::GET, CLUSTERS_PATH, &[("search", search)], None)
            .await?;
        list.items
            .into_iter()
            .next()
            .ok_or(OcmError::ClusterNotFound(req.cluster_external_id))
    }

    async fn patch_upgrade_policy(
        &self,
        req: UpgradePolicyPatchRequest,
    ) -> Result<UpgradePolicyPatchResponse, OcmError> {
        let path = self.upgrade_policy_state_path(&req.id);
        let body = serde_json::to_value(&req)
            .map_err(|e| OcmError::Config(format!("unserializable upgrade policy patch: {e}")))?;
        self.send(Method::PATCH, &path, &[], Some(body)).await
    }

    async fn get_upgrade_policy(
        &self,
        req: UpgradePolicyGetRequest,
    ) -> Result<UpgradePolicyGetResponse, OcmError> {
        let path = self.upgrade_policy_state_path(&req.id);
        self.send(Method::GET, &path, &[], None).await
    }
}

fn upgrade_policy_state_path(cluster_id: &str, policy_id: &str) -> String {
    format!("{CLUSTERS_PATH}/{cluster_id}/upgrade_policies/{policy_id}/state")
}

fn method_name(method: &Method) -> &'static str {
    if *method == Method::GET {
        "GET"
    } else if *method == Method::PATCH {
        "PATCH"
    } else {
        "OTHER"
    }
}
