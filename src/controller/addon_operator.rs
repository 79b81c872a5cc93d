//! # AddonOperator Controller
//!
//! Reconciles the singleton `AddonOperator` object, the administrative
//! surface of the operator:
//!
//! - `spec.paused` toggles the global pause of the Addon reconciler
//! - `spec.ocm` builds an OCM client and injects it into the Addon reconciler
//! - the status carries `Paused`/`Available` conditions and a heartbeat

use crate::config::SharedOperatorConfig;
use crate::constants::{
    ADDON_OPERATOR_HEARTBEAT_INTERVAL, ADDON_OPERATOR_OBJECT_NAME, DEFAULT_RETRY_AFTER,
    FIELD_MANAGER, OCM_TOKEN_SECRET_KEY,
};
use crate::controller::addon::{AddonReconciler, RequeueError};
use crate::crd::conditions::{self, reason, set_condition, Condition, ConditionStatus};
use crate::crd::{AddonOperator, AddonOperatorOcm, AddonOperatorSpec, AddonOperatorStatus};
use crate::ocm::{OcmError, OcmHttpClient};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::{watcher, Controller};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum AddonOperatorError {
    #[error("failed to update global pause: {0}")]
    Pause(#[from] RequeueError),
    #[error("failed to read OCM token secret {namespace}/{name}: {source}")]
    TokenSecret {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },
    #[error("OCM token secret {namespace}/{name} has no 'token' key")]
    MissingToken { namespace: String, name: String },
    #[error("CLUSTER_EXTERNAL_ID must be set to report upgrade policies to OCM")]
    MissingClusterExternalId,
    #[error("failed to set up OCM client: {0}")]
    Ocm(#[from] OcmError),
    #[error("failed to update AddonOperator status: {0}")]
    Status(#[source] kube::Error),
    #[error("kubernetes API call timed out after {0:?}")]
    Timeout(Duration),
}

/// Shared state of the AddonOperator controller
pub struct AddonOperatorContext {
    client: Client,
    addons: Arc<AddonReconciler>,
    config: SharedOperatorConfig,
    /// OCM settings of the currently injected client
    injected_ocm: Mutex<Option<AddonOperatorOcm>>,
}

impl std::fmt::Debug for AddonOperatorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddonOperatorContext").finish_non_exhaustive()
    }
}

impl AddonOperatorContext {
    pub fn new(client: Client, addons: Arc<AddonReconciler>, config: SharedOperatorConfig) -> Self {
        Self {
            client,
            addons,
            config,
            injected_ocm: Mutex::new(None),
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, kube::Error>>,
    ) -> Result<Result<T, kube::Error>, AddonOperatorError> {
        let timeout = self.config.api_timeout();
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_elapsed| AddonOperatorError::Timeout(timeout))
    }

    async fn read_token(&self, ocm: &AddonOperatorOcm) -> Result<String, AddonOperatorError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &ocm.secret.namespace);
        let secret = self
            .bounded(secrets.get(&ocm.secret.name))
            .await?
            .map_err(|source| AddonOperatorError::TokenSecret {
                namespace: ocm.secret.namespace.clone(),
                name: ocm.secret.name.clone(),
                source,
            })?;

        secret
            .data
            .as_ref()
            .and_then(|data| data.get(OCM_TOKEN_SECRET_KEY))
            .map(|token| String::from_utf8_lossy(&token.0).trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AddonOperatorError::MissingToken {
                namespace: ocm.secret.namespace.clone(),
                name: ocm.secret.name.clone(),
            })
    }

    /// Build and inject an OCM client when the OCM settings changed
    async fn sync_ocm(&self, desired: Option<&AddonOperatorOcm>) -> Result<(), AddonOperatorError> {
        let Some(desired) = desired else {
            return Ok(());
        };
        let mut injected = self.injected_ocm.lock().await;
        if injected.as_ref() == Some(desired) {
            return Ok(());
        }

        let cluster_external_id = self
            .config
            .cluster_external_id
            .as_deref()
            .ok_or(AddonOperatorError::MissingClusterExternalId)?;
        let token = self.read_token(desired).await?;
        let client = OcmHttpClient::connect(
            &desired.endpoint,
            &token,
            cluster_external_id,
            self.config.api_timeout(),
        )
        .await?;

        self.addons.inject_ocm_client(Arc::new(client)).await?;
        info!(ocm.endpoint = %desired.endpoint, "OCM client injected");
        *injected = Some(desired.clone());
        Ok(())
    }
}

/// Apply the desired global pause; returns whether a toggle ran
///
/// A toggle whose requeue sweep failed is run again even though the flag
/// already has the desired value.
///
/// # Errors
///
/// Fails when the sweep that follows a toggle fails.
pub async fn sync_pause(addons: &AddonReconciler, desired: bool) -> Result<bool, RequeueError> {
    if addons.is_pause_settled(desired).await {
        return Ok(false);
    }
    if desired {
        addons.enable_global_pause().await?;
        info!("⏸️ global pause enabled");
    } else {
        addons.disable_global_pause().await?;
        info!("▶️ global pause disabled");
    }
    Ok(true)
}

/// Conditions reported on the AddonOperator status
pub fn operator_conditions(
    existing: &[Condition],
    paused: bool,
    ocm_error: Option<&AddonOperatorError>,
    generation: Option<i64>,
) -> Vec<Condition> {
    let mut updated = existing.to_vec();
    if paused {
        set_condition(
            &mut updated,
            Condition::new(
                conditions::PAUSED,
                ConditionStatus::True,
                reason::ADDON_OPERATOR_PAUSED,
                "Addon operator is paused",
            )
            .with_generation(generation),
        );
    } else {
        conditions::remove_condition(&mut updated, conditions::PAUSED);
    }

    let available = match ocm_error {
        Some(e) => Condition::new(
            conditions::AVAILABLE,
            ConditionStatus::False,
            reason::OCM_CLIENT_UNAVAILABLE,
            e.to_string(),
        ),
        None => Condition::new(
            conditions::AVAILABLE,
            ConditionStatus::True,
            reason::ADDON_OPERATOR_READY,
            "Addon operator is ready",
        ),
    };
    set_condition(&mut updated, available.with_generation(generation));
    updated
}

pub async fn reconcile(
    operator: Arc<AddonOperator>,
    ctx: Arc<AddonOperatorContext>,
) -> Result<Action, AddonOperatorError> {
    let name = operator.name_any();
    if name != ADDON_OPERATOR_OBJECT_NAME {
        warn!(name = %name, "ignoring AddonOperator object with unexpected name");
        return Ok(Action::await_change());
    }

    let paused = operator.spec.paused;
    sync_pause(&ctx.addons, paused).await?;
    ctx.addons.recorder().set_addon_operator_paused(paused);

    let ocm_result = ctx.sync_ocm(operator.spec.ocm.as_ref()).await;
    if let Err(e) = &ocm_result {
        error!(error = %e, "failed to configure OCM client");
    }

    let existing = operator
        .status
        .as_ref()
        .map(|s| s.conditions.as_slice())
        .unwrap_or_default();
    let status = AddonOperatorStatus {
        observed_generation: operator.metadata.generation,
        conditions: operator_conditions(
            existing,
            paused,
            ocm_result.as_ref().err(),
            operator.metadata.generation,
        ),
        last_heartbeat_time: Some(chrono::Utc::now().to_rfc3339()),
    };

    let api: Api<AddonOperator> = Api::all(ctx.client.clone());
    let params = PatchParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..PatchParams::default()
    };
    let patch = json!({ "status": status });
    ctx.bounded(api.patch_status(&name, &params, &Patch::Merge(&patch)))
        .await?
        .map_err(AddonOperatorError::Status)?;

    ocm_result?;
    Ok(Action::requeue(ADDON_OPERATOR_HEARTBEAT_INTERVAL))
}

pub fn error_policy(
    _operator: Arc<AddonOperator>,
    error: &AddonOperatorError,
    _ctx: Arc<AddonOperatorContext>,
) -> Action {
    warn!(error = %error, "AddonOperator reconcile failed, retrying");
    Action::requeue(DEFAULT_RETRY_AFTER)
}

/// Create the default AddonOperator object when it does not exist yet
///
/// # Errors
///
/// Propagates API errors other than a concurrent creation.
pub async fn ensure_addon_operator_object(client: Client) -> Result<(), kube::Error> {
    let api: Api<AddonOperator> = Api::all(client);
    if api.get_opt(ADDON_OPERATOR_OBJECT_NAME).await?.is_some() {
        return Ok(());
    }

    let operator = AddonOperator::new(ADDON_OPERATOR_OBJECT_NAME, AddonOperatorSpec::default());
    match api.create(&PostParams::default(), &operator).await {
        Ok(_) => {
            info!(name = ADDON_OPERATOR_OBJECT_NAME, "created default AddonOperator object");
            Ok(())
        }
        Err(kube::Error::Api(e)) if e.code == 409 => Ok(()),
        Err(e) => Err(e),
    }
}

/// Build the AddonOperator controller
pub fn addon_operator_controller(client: &Client) -> Controller<AddonOperator> {
    let api: Api<AddonOperator> = Api::all(client.clone());
    Controller::new(api, watcher::Config::default().any_semantic())
}
