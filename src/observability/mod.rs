//! # Observability
//!
//! - `metrics`: Prometheus registry and controller counters
//! - `recorder`: Addon population gauges derived from observed conditions
//! - `summary`: Quantile summary used for OCM request latency

pub mod metrics;
pub mod recorder;
pub mod summary;

pub use metrics::*;
pub use recorder::{AddonConditions, Recorder};
