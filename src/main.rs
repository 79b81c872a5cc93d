//! # Addon Operator
//!
//! A Kubernetes operator that installs Addons into a cluster and tracks them.
//!
//! ## Overview
//!
//! For every `Addon` resource the operator:
//!
//! 1. **Creates namespaces** owned by the Addon
//! 2. **Propagates pull secrets** from the operator namespace into those namespaces
//! 3. **Creates an `AddonInstance`** the installed operator heartbeats into
//! 4. **Installs through OLM** (CatalogSource, OperatorGroup, Subscription) and waits for the CSV
//! 5. **Federates monitoring** from the Addon's Prometheus when configured
//! 6. **Reports upgrade status** to OCM when an upgrade policy is set
//!
//! The singleton `AddonOperator` object pauses all Addons and configures OCM.
//!
//! ## Usage
//!
//! Configuration is read from the environment, see
//! [`OperatorConfig`](addon_operator::config::OperatorConfig).

use addon_operator::runtime::{initialization::initialize, watch_loop::run_watch_loop};
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;
    run_watch_loop(init).await
}
