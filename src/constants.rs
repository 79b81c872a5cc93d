//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! Values prefixed with `DEFAULT_` can be overridden through
//! [`OperatorConfig`](crate::config::OperatorConfig).

use std::time::Duration;

/// Requeue delay used by phases that wait for eventual convergence
/// (for example an operator install that has not finished yet).
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(10);

/// Finalizer marking that cache cleanup must run before an Addon is removed.
pub const CACHE_FINALIZER: &str = "addons.managed.openshift.io/cache";

/// Field manager used for server-side apply and status patches.
pub const FIELD_MANAGER: &str = "addon-operator";

/// Label carrying the owning Addon name on every object the operator creates.
pub const ADDON_NAME_LABEL: &str = "addons.managed.openshift.io/addon-name";

/// Name of the singleton `AddonOperator` object.
pub const ADDON_OPERATOR_OBJECT_NAME: &str = "addon-operator";

/// Name of the `AddonInstance` created in each Addon install namespace.
pub const ADDON_INSTANCE_NAME: &str = "addon-instance";

/// Default heartbeat period written into new `AddonInstance` objects.
pub const DEFAULT_ADDON_INSTANCE_HEARTBEAT_PERIOD: &str = "10s";

/// Key inside the OCM secret that holds the bearer token.
pub const OCM_TOKEN_SECRET_KEY: &str = "token";

/// Default namespace the operator runs in.
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "addon-operator";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default deadline for a single Kubernetes or OCM API call.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Default capacity of the administrative requeue queue.
pub const DEFAULT_REQUEUE_QUEUE_CAPACITY: usize = 1024;

/// Default time an administrative sweep waits for queue capacity per Addon.
pub const DEFAULT_REQUEUE_SEND_TIMEOUT_MS: u64 = 5_000;

/// Default lower bound of the per-Addon error backoff (seconds).
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 1;

/// Default upper bound of the per-Addon error backoff (seconds).
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Interval at which the `AddonOperator` object heartbeat is refreshed.
pub const ADDON_OPERATOR_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);
