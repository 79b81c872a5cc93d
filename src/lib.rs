//! Addon Operator Library
//!
//! This library provides the core functionality for the Addon Operator: the
//! Addon reconciliation pipeline, global and per-Addon pause handling, the
//! administrative requeue sweep, subordinate-resource event routing, the
//! metrics delta engine and upgrade-policy reporting to OCM.
//!
//! ## Quick Start
//!
//! ```rust
//! use addon_operator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod ocm;
pub mod prelude;
pub mod runtime;
