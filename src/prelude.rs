//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use addon_operator::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Reconciler types
pub use crate::controller::addon::{
    reconcile, AddonReconciler, AddonStore, CsvEventHandler, Phase, PhaseResult, ReconcilerError,
    RequeueError, RequeueResult, SetupError, StoreError,
};

// Config types
pub use crate::config::{OperatorConfig, SharedOperatorConfig};

// Metrics
pub use crate::observability::{AddonConditions, Recorder};

// OCM
pub use crate::ocm::{OcmClient, OcmError, OcmHttpClient};
