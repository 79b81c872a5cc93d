//! # Initialization
//!
//! Operator initialization: rustls setup, tracing, metrics, server startup,
//! Kubernetes client and reconciler wiring.

use crate::config::{OperatorConfig, SharedOperatorConfig};
use crate::controller::addon::phases::default_phases;
use crate::controller::addon::{
    requeue_queue, AddonReconciler, AddonStore, CsvEventHandler, KubeAddonStore, RequeueReceiver,
};
use crate::controller::addon_operator::ensure_addon_operator_object;
use crate::controller::server::{start_server, ServerState};
use crate::observability::{self, Recorder};
use anyhow::{anyhow, Context, Result};
use kube::Client;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Everything the watch loop needs to run the controllers
pub struct InitializationResult {
    pub client: Client,
    pub reconciler: Arc<AddonReconciler>,
    /// Consumed by the Addon controller through `reconcile_on`
    pub requeue_receiver: RequeueReceiver,
    pub server_state: Arc<ServerState>,
    pub config: SharedOperatorConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready())
            .finish_non_exhaustive()
    }
}

fn init_tracing(config: &OperatorConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("addon_operator={}", config.log_level).into());
    let result = if config.json_logs() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };
    if let Err(e) = result {
        warn!("Tracing subscriber already initialized: {}", e);
    }
}

/// Initialize the operator runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Addon reconciler wiring
/// - Default AddonOperator object
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before any TLS connection is made
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_provider| anyhow!("Failed to install rustls crypto provider"))?;

    let config: SharedOperatorConfig = Arc::new(OperatorConfig::from_env());
    init_tracing(&config);

    info!("Starting Addon Operator");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;
    let recorder = Arc::new(Recorder::new().context("Failed to create metrics recorder")?);
    recorder
        .register(observability::metrics::registry())
        .context("Failed to register addon metrics")?;

    let server_state = Arc::new(ServerState::new(Some(Arc::clone(&recorder))));
    let server_state_clone = Arc::clone(&server_state);
    let server_port = config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let (requeue_sender, requeue_receiver) =
        requeue_queue(config.requeue_queue_capacity, config.requeue_send_timeout());
    let csv_handler = Arc::new(CsvEventHandler::new());
    let store: Arc<dyn AddonStore> =
        Arc::new(KubeAddonStore::new(client.clone(), config.api_timeout()));

    let reconciler = AddonReconciler::builder()
        .store(Arc::clone(&store))
        .phases(default_phases(&client, Arc::clone(&csv_handler), &config))
        .csv_event_handler(csv_handler)
        .requeue_sender(requeue_sender)
        .recorder(recorder)
        .config(Arc::clone(&config))
        .build()
        .context("Failed to set up Addon reconciler")?;

    ensure_addon_operator_object(client.clone())
        .await
        .context("Failed to ensure AddonOperator object")?;

    log_existing_addons(store.as_ref()).await;

    info!("Operator initialized, starting watch loop...");
    Ok(InitializationResult {
        client,
        reconciler: Arc::new(reconciler),
        requeue_receiver,
        server_state,
        config,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    config: &OperatorConfig,
) -> Result<()> {
    let startup_timeout = config.server_startup_timeout();
    let poll_interval = config.server_poll_interval();
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow!("HTTP server failed to start"));
        }
        if server_state.is_ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }
        if start_time.elapsed() > startup_timeout {
            return Err(anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Log the Addons present at startup; the controller's initial list reconciles them
async fn log_existing_addons(store: &dyn AddonStore) {
    match store.list().await {
        Ok(addons) => {
            let paused = addons.iter().filter(|a| a.spec.paused).count();
            info!(
                "Found {} existing Addon(s) ({} paused), they will be reconciled by the watch",
                addons.len(),
                paused
            );
        }
        Err(e) => {
            warn!("Failed to list existing Addons: {}", e);
        }
    }
}
