//! # Watch Loop
//!
//! Runs the Addon and AddonOperator controllers until a shutdown signal is
//! received.

use crate::controller::addon::{reconcile, watches::addon_controller};
use crate::controller::addon_operator::{self, AddonOperatorContext};
use crate::runtime::error_policy::handle_reconciliation_error;
use crate::runtime::initialization::InitializationResult;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Run both controllers until shutdown
pub async fn run_watch_loop(init: InitializationResult) -> Result<(), anyhow::Error> {
    let InitializationResult {
        client,
        reconciler,
        requeue_receiver,
        server_state,
        config,
    } = init;

    // Mark the server not ready as soon as SIGTERM/SIGINT arrives
    let shutdown_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
            shutdown_state.set_ready(false);
        }
    });

    let addon_watch_span = tracing::info_span!("controller.watch", controller = "addon");
    let addons = addon_controller(
        &client,
        Arc::clone(reconciler.csv_handler()),
        requeue_receiver,
        &config,
    )
    .shutdown_on_signal()
    .run(reconcile, handle_reconciliation_error, Arc::clone(&reconciler))
    .for_each(|result| async move {
        match result {
            Ok((obj, _action)) => debug!(addon = %obj.name, "reconciled"),
            Err(e) => warn!("Addon controller stream error: {}", e),
        }
    });

    let operator_ctx = Arc::new(AddonOperatorContext::new(
        client.clone(),
        Arc::clone(&reconciler),
        Arc::clone(&config),
    ));
    let operator_watch_span =
        tracing::info_span!("controller.watch", controller = "addon-operator");
    let operators = addon_operator::addon_operator_controller(&client)
        .shutdown_on_signal()
        .run(
            addon_operator::reconcile,
            addon_operator::error_policy,
            operator_ctx,
        )
        .for_each(|result| async move {
            if let Err(e) = result {
                warn!("AddonOperator controller stream error: {}", e);
            }
        });

    info!("Starting controller watch loops...");
    tokio::join!(
        addons.instrument(addon_watch_span),
        operators.instrument(operator_watch_span)
    );

    server_state.set_ready(false);
    info!("Controllers stopped gracefully");
    Ok(())
}
