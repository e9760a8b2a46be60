//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::MonzaBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    bind_address: String,
    queue_capacity: usize,
    destinations: Vec<DestinationInfo>,
}

#[derive(Serialize)]
struct DestinationInfo {
    name: String,
    destination_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &MonzaBlueprint, args: &InfoArgs) -> ConfigInfo {
    let destinations = blueprint
        .destinations
        .iter()
        .map(|d| DestinationInfo {
            name: d.name.clone(),
            destination_type: format!("{:?}", d.destination_type),
            // Sorted so output is stable
            params: if args.params {
                d.params.clone().into_iter().collect()
            } else {
                BTreeMap::new()
            },
        })
        .collect();

    ConfigInfo {
        bind_address: blueprint.bind_address.clone(),
        queue_capacity: blueprint.queue_capacity,
        destinations,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Monza Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Dispatcher");
    println!("   ├─ Bind address: {}", info.bind_address);
    println!("   └─ Queue capacity: {}", info.queue_capacity);

    println!("\n📤 Destinations ({})", info.destinations.len());
    for (i, destination) in info.destinations.iter().enumerate() {
        let is_last = i == info.destinations.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} ({})",
            prefix, destination.name, destination.destination_type
        );
        for (key, value) in &destination.params {
            println!("   {}  • {} = {}", child_prefix, key, value);
        }
    }

    println!();
}
