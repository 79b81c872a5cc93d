//! # Upgrade Policy Reporting
//!
//! Reports the progress of an Addon upgrade to OCM. While the Addon is not
//! Available the policy is reported as `started`; once Available it is
//! reported as `completed`. The last reported value is kept in
//! `status.upgradePolicy` so each transition is sent once per policy id.

use crate::crd::conditions::{self, is_condition_true};
use crate::crd::{Addon, AddonUpgradePolicyStatus, AddonUpgradePolicyValue};
use crate::observability::Recorder;
use crate::ocm::{OcmClient, OcmError, UpgradePolicyGetRequest, UpgradePolicyPatchRequest};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Report the upgrade-policy state of `addon` and record it in its status
///
/// A missing client or a missing `spec.upgradePolicy` is a no-op.
pub async fn report_upgrade_policy_status(
    client: Option<Arc<dyn OcmClient>>,
    recorder: &Recorder,
    timeout: Duration,
    addon: &mut Addon,
) -> Result<(), OcmError> {
    let Some(policy) = addon.spec.upgrade_policy.clone() else {
        return Ok(());
    };
    let Some(client) = client else {
        debug!(policy_id = %policy.id, "OCM client not yet initialized, skipping upgrade policy report");
        return Ok(());
    };

    let target = if is_condition_true(addon.conditions(), conditions::AVAILABLE) {
        AddonUpgradePolicyValue::Completed
    } else {
        AddonUpgradePolicyValue::Started
    };
    let version = addon.spec.version.clone();

    if let Some(reported) = addon.status.as_ref().and_then(|s| s.upgrade_policy.as_ref()) {
        if reported.is_completed_for(&policy.id, version.as_deref()) {
            return Ok(());
        }
        if reported.id == policy.id && reported.value == target && reported.version == version {
            return Ok(());
        }
    }

    let current = timed(
        recorder,
        timeout,
        client.get_upgrade_policy(UpgradePolicyGetRequest {
            id: policy.id.clone(),
        }),
    )
    .await?;

    if current.value == Some(target.into()) {
        debug!(policy_id = %policy.id, value = target.as_str(), "upgrade policy already up to date in OCM");
    } else {
        let description = match target {
            AddonUpgradePolicyValue::Started => "Upgrade has been started.",
            AddonUpgradePolicyValue::Completed => "Upgrade has been completed.",
        };
        timed(
            recorder,
            timeout,
            client.patch_upgrade_policy(UpgradePolicyPatchRequest {
                id: policy.id.clone(),
                value: target.into(),
                description: description.to_string(),
            }),
        )
        .await?;
        info!(policy_id = %policy.id, value = target.as_str(), "reported upgrade policy state");
    }

    let observed_generation = addon.metadata.generation.unwrap_or_default();
    addon.status_mut().upgrade_policy = Some(AddonUpgradePolicyStatus {
        id: policy.id,
        value: target,
        version,
        observed_generation,
    });
    Ok(())
}

async fn timed<T>(
    recorder: &Recorder,
    timeout: Duration,
    request: impl Future<Output = Result<T, OcmError>>,
) -> Result<T, OcmError> {
    let start = Instant::now();
    let result = match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_elapsed) => Err(OcmError::Timeout(timeout)),
    };
    recorder.observe_ocm_request_latency(start.elapsed());
    result
}
