//! # Configuration
//!
//! Operator configuration loaded from environment variables.

pub mod controller;

pub use controller::*;

use std::sync::Arc;

/// Configuration shared between the controllers, the error policy and the server.
pub type SharedOperatorConfig = Arc<OperatorConfig>;
