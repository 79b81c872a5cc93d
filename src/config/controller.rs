//! # Operator Configuration
//!
//! Operator-level settings loaded from environment variables.

use std::time::Duration;

/// Operator-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    /// Namespace the operator runs in
    /// Source secrets for pull-secret propagation are read from here
    pub operator_namespace: String,
    /// HTTP server port for metrics and probes
    pub metrics_port: u16,
    /// HTTP server startup timeout (seconds)
    pub server_startup_timeout_secs: u64,
    /// HTTP server readiness poll interval (milliseconds)
    pub server_poll_interval_ms: u64,
    /// Deadline for a single Kubernetes or OCM API call (seconds)
    pub api_timeout_secs: u64,
    /// Capacity of the administrative requeue queue
    pub requeue_queue_capacity: usize,
    /// How long a sweep waits for queue capacity per Addon (milliseconds)
    pub requeue_send_timeout_ms: u64,
    /// Fibonacci error backoff lower bound (seconds)
    pub backoff_min_secs: u64,
    /// Fibonacci error backoff upper bound (seconds)
    pub backoff_max_secs: u64,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// External id of the cluster as known to OCM
    /// Resolved to the internal cluster id when an OCM client is built
    pub cluster_external_id: Option<String>,
    /// Maximum concurrent reconciliations
    pub max_concurrent_reconciliations: u16,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            operator_namespace: DEFAULT_OPERATOR_NAMESPACE.to_string(),
            metrics_port: DEFAULT_METRICS_PORT,
            server_startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            server_poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
            api_timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            requeue_queue_capacity: DEFAULT_REQUEUE_QUEUE_CAPACITY,
            requeue_send_timeout_ms: DEFAULT_REQUEUE_SEND_TIMEOUT_MS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
            cluster_external_id: None,
            max_concurrent_reconciliations: 10,
        }
    }
}

impl OperatorConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            operator_namespace: env_var_or_default_str("POD_NAMESPACE", DEFAULT_OPERATOR_NAMESPACE),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            server_startup_timeout_secs: env_var_or_default(
                "SERVER_STARTUP_TIMEOUT_SECS",
                DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            ),
            server_poll_interval_ms: env_var_or_default(
                "SERVER_POLL_INTERVAL_MS",
                DEFAULT_SERVER_POLL_INTERVAL_MS,
            ),
            api_timeout_secs: env_var_or_default("API_TIMEOUT_SECS", DEFAULT_API_TIMEOUT_SECS),
            requeue_queue_capacity: env_var_or_default(
                "REQUEUE_QUEUE_CAPACITY",
                DEFAULT_REQUEUE_QUEUE_CAPACITY,
            )
            .max(1),
            requeue_send_timeout_ms: env_var_or_default(
                "REQUEUE_SEND_TIMEOUT_MS",
                DEFAULT_REQUEUE_SEND_TIMEOUT_MS,
            ),
            backoff_min_secs: env_var_or_default("BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
            cluster_external_id: std::env::var("CLUSTER_EXTERNAL_ID")
                .ok()
                .filter(|v| !v.is_empty()),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                10,
            ),
        }
    }

    /// Get the per-call API deadline
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Get the requeue send timeout
    pub fn requeue_send_timeout(&self) -> Duration {
        Duration::from_millis(self.requeue_send_timeout_ms)
    }

    /// Get server startup timeout duration
    pub fn server_startup_timeout(&self) -> Duration {
        Duration::from_secs(self.server_startup_timeout_secs)
    }

    /// Get server poll interval duration
    pub fn server_poll_interval(&self) -> Duration {
        Duration::from_millis(self.server_poll_interval_ms)
    }

    /// Whether logs should be emitted as JSON
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
