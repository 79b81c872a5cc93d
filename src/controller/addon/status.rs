//! # Status
//!
//! Condition and phase updates applied to an in-memory Addon. Nothing here
//! talks to the API server; the reconciler persists the status once at the
//! end of a reconcile.

use crate::crd::conditions::{self, reason, set_condition, Condition, ConditionStatus};
use crate::crd::{Addon, AddonPhase};

fn set_available(addon: &mut Addon, status: ConditionStatus, reason: &str, message: String) {
    let generation = addon.metadata.generation;
    let addon_status = addon.status_mut();
    set_condition(
        &mut addon_status.conditions,
        Condition::new(conditions::AVAILABLE, status, reason, message).with_generation(generation),
    );
}

fn set_phase(addon: &mut Addon, phase: AddonPhase) {
    addon.status_mut().phase = Some(phase);
}

/// Mark the Addon as paused, either globally or through `spec.paused`
pub fn report_addon_pause_status(addon: &mut Addon, pause_reason: &str) {
    let generation = addon.metadata.generation;
    let message = if pause_reason == reason::ADDON_PAUSED {
        "Addon has been paused"
    } else {
        "Addon operator has been paused"
    };
    set_available(addon, ConditionStatus::False, pause_reason, message.to_string());
    set_condition(
        &mut addon.status_mut().conditions,
        Condition::new(conditions::PAUSED, ConditionStatus::True, pause_reason, message)
            .with_generation(generation),
    );
    set_phase(addon, AddonPhase::Pending);
}

/// Drop the `Paused` condition; returns whether it was present
pub fn remove_addon_pause_condition(addon: &mut Addon) -> bool {
    conditions::remove_condition(&mut addon.status_mut().conditions, conditions::PAUSED)
}

pub fn report_ready_status(addon: &mut Addon) {
    set_available(
        addon,
        ConditionStatus::True,
        reason::FULLY_RECONCILED,
        "All components are ready.".to_string(),
    );
    set_phase(addon, AddonPhase::Ready);
}

pub fn report_terminating_status(addon: &mut Addon) {
    set_available(
        addon,
        ConditionStatus::False,
        reason::TERMINATING,
        "Addon is being deleted.".to_string(),
    );
    set_phase(addon, AddonPhase::Terminating);
}

pub fn report_unready_csv(addon: &mut Addon, csv_status: &str) {
    set_available(
        addon,
        ConditionStatus::False,
        reason::UNREADY_CSV,
        format!("ClusterServiceVersion is not ready: {csv_status}"),
    );
    set_phase(addon, AddonPhase::Pending);
}

pub fn report_unready_namespaces(addon: &mut Addon, unready: &[String]) {
    set_available(
        addon,
        ConditionStatus::False,
        reason::UNREADY_NAMESPACES,
        format!("Namespaces not yet in Active phase: {}", unready.join(", ")),
    );
    set_phase(addon, AddonPhase::Pending);
}

pub fn report_collided_namespaces(addon: &mut Addon, collided: &[String]) {
    set_available(
        addon,
        ConditionStatus::False,
        reason::COLLIDED_NAMESPACES,
        format!("Namespaces with collisions: {}", collided.join(", ")),
    );
    set_phase(addon, AddonPhase::Error);
}

pub fn report_missing_secret_source(addon: &mut Addon, secret: &str, namespace: &str) {
    set_available(
        addon,
        ConditionStatus::False,
        reason::MISSING_SECRET_SOURCE,
        format!("Source secret {namespace}/{secret} not found"),
    );
    set_phase(addon, AddonPhase::Pending);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::conditions::{find_condition, is_condition_true};
    use crate::crd::AddonSpec;

    #[test]
    fn test_pause_then_resume() {
        let mut addon = Addon::new("a", AddonSpec::default());
        report_addon_pause_status(&mut addon, reason::ADDON_OPERATOR_PAUSED);

        let available = find_condition(addon.conditions(), conditions::AVAILABLE)
            .expect("available condition");
        assert_eq!(available.status, ConditionStatus::False);
        assert_eq!(available.reason, reason::ADDON_OPERATOR_PAUSED);
        assert!(is_condition_true(addon.conditions(), conditions::PAUSED));
        assert_eq!(addon.status.as_ref().and_then(|s| s.phase), Some(AddonPhase::Pending));

        assert!(remove_addon_pause_condition(&mut addon));
        assert!(!remove_addon_pause_condition(&mut addon));
        report_ready_status(&mut addon);
        assert!(is_condition_true(addon.conditions(), conditions::AVAILABLE));
        assert_eq!(addon.conditions().len(), 1);
    }

    #[test]
    fn test_unready_csv_message() {
        let mut addon = Addon::new("a", AddonSpec::default());
        report_unready_csv(&mut addon, "unkown/pending");
        let available = find_condition(addon.conditions(), conditions::AVAILABLE)
            .expect("available condition");
        assert_eq!(
            available.message,
            "ClusterServiceVersion is not ready: unkown/pending"
        );
        assert_eq!(available.reason, reason::UNREADY_CSV);
    }
}
