//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{MonzaBlueprint, MAX_QUEUE_CAPACITY};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{IngestConfig, IngestPipeline};

/// Execute the `run` command
pub async fn run_dispatch(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(capacity) = args.queue_capacity {
        if capacity == 0 || capacity > MAX_QUEUE_CAPACITY {
            anyhow::bail!("--queue-capacity must be between 1 and {}", MAX_QUEUE_CAPACITY);
        }
        info!(queue_capacity = capacity, "Overriding queue capacity from CLI");
        blueprint.queue_capacity = capacity;
    }

    info!(
        bind_address = %blueprint.bind_address,
        queue_capacity = blueprint.queue_capacity,
        destinations = blueprint.destinations.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = IngestPipeline::new(IngestConfig {
        blueprint,
        input: args.input.clone(),
        max_events: if args.max_events == 0 {
            None
        } else {
            Some(args.max_events)
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    // Signals stop ingestion; the pipeline still drains and tears down.
    let ctx = CancellationToken::new();
    let signal_ctx = ctx.clone();
    tokio::spawn(async move {
        setup_shutdown_signal().await;
        warn!("Received shutdown signal, stopping dispatch...");
        signal_ctx.cancel();
    });

    info!("Starting dispatch...");
    let stats = pipeline.run(&ctx).await.context("Dispatch failed")?;

    info!(
        events = stats.ingest.total_events,
        decode_errors = stats.ingest.decode_errors,
        duration_secs = stats.duration.as_secs_f64(),
        events_per_sec = format!("{:.2}", stats.events_per_sec()),
        "Dispatch completed"
    );
    stats.print_summary();

    info!("Monza finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &MonzaBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Bind address: {}", blueprint.bind_address);
    println!("Queue capacity: {}", blueprint.queue_capacity);

    println!("\nDestinations ({}):", blueprint.destinations.len());
    for destination in &blueprint.destinations {
        println!(
            "  - {} ({:?})",
            destination.name, destination.destination_type
        );
    }

    println!();
}
