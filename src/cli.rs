//! # addonctl
//!
//! Command-line interface for the Addon operator.
//!
//! ## Usage
//!
//! ```bash
//! # Pause all Addons (global pause through the AddonOperator object)
//! addonctl pause
//!
//! # Pause a single Addon
//! addonctl pause --addon my-addon
//!
//! # Resume all Addons / a single Addon
//! addonctl resume
//! addonctl resume --addon my-addon
//!
//! # List Addons
//! addonctl list
//!
//! # Show the status of an Addon
//! addonctl status my-addon
//! ```

use addon_operator::constants::ADDON_OPERATOR_OBJECT_NAME;
use addon_operator::crd::conditions::{self, find_condition};
use addon_operator::crd::{Addon, AddonOperator};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;

/// Addon Operator CLI
#[derive(Debug, Parser)]
#[command(name = "addonctl", about = "Addon Operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Pause reconciliation globally, or of a single Addon with --addon
    Pause {
        /// Name of the Addon to pause
        #[arg(long)]
        addon: Option<String>,
    },
    /// Resume reconciliation globally, or of a single Addon with --addon
    Resume {
        /// Name of the Addon to resume
        #[arg(long)]
        addon: Option<String>,
    },
    /// List all Addons
    List,
    /// Show the status of an Addon
    Status {
        /// Name of the Addon
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_provider| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let cli = Cli::parse();
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    match cli.command {
        Commands::Pause { addon } => set_paused(client, addon, true).await,
        Commands::Resume { addon } => set_paused(client, addon, false).await,
        Commands::List => list_command(client).await,
        Commands::Status { name } => status_command(client, &name).await,
    }
}

async fn set_paused(client: Client, addon: Option<String>, paused: bool) -> Result<()> {
    let patch = json!({ "spec": { "paused": paused } });
    let verb = if paused { "Paused" } else { "Resumed" };

    match addon {
        Some(name) => {
            let api: Api<Addon> = Api::all(client);
            api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
                .await
                .with_context(|| format!("Failed to update Addon '{name}'"))?;
            println!("✅ {verb} Addon '{name}'");
        }
        None => {
            let api: Api<AddonOperator> = Api::all(client);
            api.patch(
                ADDON_OPERATOR_OBJECT_NAME,
                &PatchParams::default(),
                &Patch::Merge(&patch),
            )
            .await
            .context("Failed to update AddonOperator")?;
            println!("✅ {verb} all Addons");
        }
    }
    Ok(())
}

fn available_reason(addon: &Addon) -> String {
    find_condition(addon.conditions(), conditions::AVAILABLE)
        .map_or_else(|| "-".to_string(), |c| format!("{} ({})", c.status, c.reason))
}

async fn list_command(client: Client) -> Result<()> {
    let api: Api<Addon> = Api::all(client);
    let addons = api
        .list(&ListParams::default())
        .await
        .context("Failed to list Addons")?;

    if addons.items.is_empty() {
        println!("No Addons found.");
        return Ok(());
    }

    println!("{:<30} {:<12} {:<8} {:<30}", "NAME", "PHASE", "PAUSED", "AVAILABLE");
    println!("{}", "-".repeat(82));
    for addon in &addons.items {
        let phase = addon
            .status
            .as_ref()
            .and_then(|s| s.phase)
            .map_or("-", |p| p.as_str());
        let paused = if addon.spec.paused { "Yes" } else { "No" };
        println!(
            "{:<30} {:<12} {:<8} {:<30}",
            addon.name_any(),
            phase,
            paused,
            available_reason(addon)
        );
    }
    Ok(())
}

async fn status_command(client: Client, name: &str) -> Result<()> {
    let api: Api<Addon> = Api::all(client);
    let addon = api
        .get(name)
        .await
        .with_context(|| format!("Failed to get Addon '{name}'"))?;

    println!("Addon: {}", addon.name_any());
    println!("  Display name: {}", addon.spec.display_name);
    if let Some(version) = &addon.spec.version {
        println!("  Version: {version}");
    }
    println!("  Paused: {}", addon.spec.paused);

    let Some(status) = &addon.status else {
        println!("  Status: not yet reconciled");
        return Ok(());
    };
    println!(
        "  Phase: {}",
        status.phase.map_or("-", |p| p.as_str())
    );
    if let Some(generation) = status.observed_generation {
        println!("  Observed generation: {generation}");
    }
    for condition in &status.conditions {
        println!(
            "  {}: {} ({}) {}",
            condition.r#type, condition.status, condition.reason, condition.message
        );
    }
    if let Some(policy) = &status.upgrade_policy {
        println!(
            "  Upgrade policy {}: {}",
            policy.id,
            policy.value.as_str()
        );
    }
    Ok(())
}
