//! # CRD Generator
//!
//! Generates Kubernetes CustomResourceDefinition (CRD) YAML from the Rust type
//! definitions of `Addon`, `AddonInstance` and `AddonOperator`.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/addons.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use addon_operator::crd::{Addon, AddonInstance, AddonOperator};
use kube::core::CustomResourceExt;

fn main() {
    let crds = [Addon::crd(), AddonInstance::crd(), AddonOperator::crd()];

    let mut documents = Vec::with_capacity(crds.len());
    for crd in &crds {
        match serde_yaml::to_string(crd) {
            Ok(yaml) => documents.push(yaml),
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
    print!("{}", documents.join("---\n"));
}
