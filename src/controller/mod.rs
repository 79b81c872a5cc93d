//! # Controller
//!
//! Core controller modules for the Addon operator.
//!
//! - `addon`: Addon reconciliation pipeline, pause and OCM state
//! - `addon_operator`: reconciler of the singleton `AddonOperator` object
//! - `backoff`: Fibonacci backoff mechanism for retries
//! - `server`: HTTP server for metrics and health checks

pub mod addon;
pub mod addon_operator;
pub mod backoff;
pub mod server;
