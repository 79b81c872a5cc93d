//! # Addon Metrics Recorder
//!
//! Derives the Addon population gauges from the conditions observed on every
//! reconcile.
//!
//! Reconciles report the same Addon over and over, so the recorder keeps the
//! last `{available, paused}` snapshot per Addon and only moves a gauge when a
//! value flips. Every increment for an Addon is matched by exactly one
//! decrement, either on a flip back or when the Addon is uninstalled.
//!
//! ## Metrics Exposed
//!
//! - `addon_operator_addons_total` - Number of Addons installed
//! - `addon_operator_addons_available` - Number of Addons with `Available=True`
//! - `addon_operator_addons_paused` - Number of Addons with `Paused=True`
//! - `addon_operator_paused` - 1 when the whole operator is paused
//! - `addon_operator_ocm_api_requests_durations` - OCM request latency summary (microseconds)

use crate::crd::conditions::{self, Condition};
use crate::crd::Addon;
use crate::observability::summary::LatencySummary;
use prometheus::{IntGauge, Registry};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

const OCM_LATENCY_OBJECTIVES: &[(f64, f64)] = &[(0.5, 0.05), (0.9, 0.01), (0.99, 0.001)];

/// Condition snapshot of one Addon as last seen by the recorder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddonConditions {
    pub available: bool,
    pub paused: bool,
}

impl AddonConditions {
    pub fn from_conditions(conditions: &[Condition]) -> Self {
        Self {
            available: conditions::is_condition_true(conditions, conditions::AVAILABLE),
            paused: conditions::is_condition_true(conditions, conditions::PAUSED),
        }
    }
}

#[derive(Debug)]
pub struct Recorder {
    addons: Mutex<HashMap<String, AddonConditions>>,
    addons_total: IntGauge,
    addons_available: IntGauge,
    addons_paused: IntGauge,
    operator_paused: IntGauge,
    ocm_api_latency: LatencySummary,
}

impl Recorder {
    /// Create a recorder with unregistered gauges
    ///
    /// # Errors
    ///
    /// Fails only if a metric name or help text is invalid.
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            addons: Mutex::new(HashMap::new()),
            addons_total: IntGauge::new(
                "addon_operator_addons_total",
                "Total number of addon installations",
            )?,
            addons_available: IntGauge::new(
                "addon_operator_addons_available",
                "Number of Addons with Available=True",
            )?,
            addons_paused: IntGauge::new(
                "addon_operator_addons_paused",
                "Number of Addons with Paused=True",
            )?,
            operator_paused: IntGauge::new(
                "addon_operator_paused",
                "A boolean that tells if the AddonOperator is paused",
            )?,
            ocm_api_latency: LatencySummary::new(
                "addon_operator_ocm_api_requests_durations",
                "OCM API latencies in microseconds",
                OCM_LATENCY_OBJECTIVES,
            ),
        })
    }

    /// Register the gauges into `registry`
    ///
    /// # Errors
    ///
    /// Fails when a metric with the same name is already registered.
    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.addons_total.clone()))?;
        registry.register(Box::new(self.addons_available.clone()))?;
        registry.register(Box::new(self.addons_paused.clone()))?;
        registry.register(Box::new(self.operator_paused.clone()))?;
        Ok(())
    }

    /// Apply the condition delta of one Addon observation
    ///
    /// `key` identifies the Addon (UID, falling back to the name). When
    /// `uninstalling` is set the Addon is removed from the population after
    /// its latest snapshot has been applied.
    pub fn record(&self, key: &str, conditions: &[Condition], uninstalling: bool) {
        let current = AddonConditions::from_conditions(conditions);
        let mut addons = self.addons.lock().unwrap_or_else(PoisonError::into_inner);

        match addons.insert(key.to_string(), current) {
            None => {
                self.addons_total.inc();
                if current.available {
                    self.addons_available.inc();
                }
                if current.paused {
                    self.addons_paused.inc();
                }
            }
            Some(previous) => {
                apply_flip(&self.addons_available, previous.available, current.available);
                apply_flip(&self.addons_paused, previous.paused, current.paused);
            }
        }

        if uninstalling {
            self.addons_total.dec();
            if current.available {
                self.addons_available.dec();
            }
            if current.paused {
                self.addons_paused.dec();
            }
            addons.remove(key);
            debug!(addon.key = key, "removed uninstalled addon from metrics");
        }
    }

    /// Record the current conditions of `addon`, treating a pending deletion as uninstall
    pub fn record_addon_metrics(&self, addon: &Addon) {
        self.record(
            &addon.metrics_key(),
            addon.conditions(),
            addon.is_deletion_requested(),
        );
    }

    /// Record one OCM request latency
    pub fn observe_ocm_request_latency(&self, duration: Duration) {
        #[allow(
            clippy::cast_precision_loss,
            reason = "latencies are far below f64 integer precision"
        )]
        self.ocm_api_latency.observe(duration.as_micros() as f64);
    }

    pub fn set_addon_operator_paused(&self, paused: bool) {
        self.operator_paused.set(i64::from(paused));
    }

    /// Text exposition of the OCM latency summary, appended to `/metrics`
    pub fn encode_summaries(&self) -> String {
        self.ocm_api_latency.encode_text()
    }

    pub fn addons_total(&self) -> i64 {
        self.addons_total.get()
    }

    pub fn addons_available(&self) -> i64 {
        self.addons_available.get()
    }

    pub fn addons_paused(&self) -> i64 {
        self.addons_paused.get()
    }

    pub fn addon_operator_paused(&self) -> i64 {
        self.operator_paused.get()
    }

    pub fn ocm_request_count(&self) -> u64 {
        self.ocm_api_latency.sample_count()
    }

    /// Whether the recorder still tracks the Addon
    pub fn is_tracked(&self, key: &str) -> bool {
        self.addons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}

fn apply_flip(gauge: &IntGauge, previous: bool, current: bool) {
    match (previous, current) {
        (true, false) => gauge.dec(),
        (false, true) => gauge.inc(),
        _ => {}
    }
}
