//! Ingestion loop - reads newline-delimited JSON events and records them.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{Event, MonzaBlueprint};
use dispatcher::{Dispatcher, DispatcherConfig, DispatcherError};
use observability::IngestStatsAggregator;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::IngestStats;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Ingestion configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Dispatcher configuration
    pub blueprint: MonzaBlueprint,

    /// Input file (None = stdin)
    pub input: Option<PathBuf>,

    /// Maximum number of events to record (None = unlimited)
    pub max_events: Option<u64>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Reads events from the input and feeds the process-wide dispatcher
pub struct IngestPipeline {
    config: IngestConfig,
}

impl IngestPipeline {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    /// Run until end of input, the event limit, or cancellation of `ctx`
    ///
    /// `ctx` stops ingestion only. Destinations get their own context, and
    /// the dispatcher is torn down before returning in every case.
    pub async fn run(self, ctx: &CancellationToken) -> Result<IngestStats> {
        let start_time = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let dispatcher_config = DispatcherConfig::from_blueprint(&self.config.blueprint)
            .context("Failed to create destinations")?;
        let dispatch_ctx = CancellationToken::new();
        let dispatcher = dispatcher::get(&dispatch_ctx, dispatcher_config)
            .await
            .context("Failed to start dispatcher")?;

        let active_destinations = dispatcher.destination_names().await.len();
        observability::record_active_destinations(active_destinations);
        info!(active_destinations, "Dispatcher started");

        let reader = open_input(self.config.input.as_ref()).await?;
        let mut aggregator = IngestStatsAggregator::new();
        let ingested = ingest_lines(
            &dispatcher,
            reader,
            ctx,
            self.config.max_events,
            &mut aggregator,
        )
        .await;

        wait_for_drain(&dispatcher, ctx).await;
        match dispatcher.teardown(&dispatch_ctx).await {
            Ok(()) | Err(DispatcherError::AlreadyTornDown) => {}
            Err(e) => warn!(error = %e, "Dispatcher teardown failed"),
        }
        ingested?;

        Ok(IngestStats {
            duration: start_time.elapsed(),
            active_destinations,
            ingest: aggregator,
            dispatch: dispatcher.metrics(),
        })
    }
}

async fn open_input(input: Option<&PathBuf>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            info!(input = %path.display(), "Reading events from file");
            Ok(Box::new(BufReader::new(file)))
        }
        None => {
            info!("Reading events from stdin");
            Ok(Box::new(BufReader::new(tokio::io::stdin())))
        }
    }
}

/// Wait until the fan-out loop has dequeued every recorded event
///
/// Teardown discards queued events, so end of input waits here first. Gives
/// up on cancellation or after `DRAIN_TIMEOUT`.
pub(crate) async fn wait_for_drain(dispatcher: &Dispatcher, ctx: &CancellationToken) {
    let drained = async {
        loop {
            let snapshot = dispatcher.metrics();
            if snapshot.dispatched_count >= snapshot.recorded_count {
                break;
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    };

    tokio::select! {
        _ = ctx.cancelled() => debug!("Drain skipped, shutting down"),
        result = tokio::time::timeout(DRAIN_TIMEOUT, drained) => {
            if result.is_err() {
                let snapshot = dispatcher.metrics();
                warn!(
                    pending = snapshot.recorded_count.saturating_sub(snapshot.dispatched_count),
                    "Queue not drained before teardown"
                );
            }
        }
    }
}

/// Decode each non-blank line as an Event and record it
///
/// Undecodable lines are counted and skipped. Stops at end of input, after
/// `max_events` recorded events, or when `ctx` is cancelled.
pub(crate) async fn ingest_lines<R: AsyncBufRead + Unpin>(
    dispatcher: &Dispatcher,
    reader: R,
    ctx: &CancellationToken,
    max_events: Option<u64>,
    stats: &mut IngestStatsAggregator,
) -> Result<()> {
    let mut lines = reader.lines();

    loop {
        if max_events.is_some_and(|max| stats.total_events >= max) {
            info!(max_events = ?max_events, "Event limit reached");
            break;
        }

        let line = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                info!("Ingestion cancelled");
                break;
            }
            line = lines.next_line() => line.context("Failed to read input")?,
        };
        let Some(line) = line else {
            debug!("End of input");
            break;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = match Event::from_json(line.as_bytes()) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Skipping undecodable line");
                stats.record_error();
                observability::record_ingest_error();
                continue;
            }
        };

        let service_id = event.service_id().clone();
        let enqueue_start = Instant::now();
        dispatcher.record(event).await;
        let wait_ms = enqueue_start.elapsed().as_secs_f64() * 1000.0;

        stats.update(service_id.as_str(), wait_ms);
        observability::record_event_ingested(service_id.as_str());
        observability::record_enqueue_wait_ms(wait_ms);
    }

    Ok(())
}
