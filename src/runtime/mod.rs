//! # Runtime
//!
//! Process-level wiring of the operator binary.
//!
//! - `error_policy`: per-Addon Fibonacci backoff on reconcile errors
//! - `initialization`: tracing, metrics, HTTP server and reconciler setup
//! - `watch_loop`: runs the Addon and AddonOperator controllers

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
