//! Ingestion statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::IngestStatsAggregator;

/// Statistics from an ingestion run
#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Destinations active when ingestion started
    pub active_destinations: usize,

    /// Per-line ingestion statistics
    pub ingest: IngestStatsAggregator,

    /// Dispatcher counters taken after teardown
    pub dispatch: MetricsSnapshot,
}

impl IngestStats {
    /// Events recorded per second
    pub fn events_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ingest.total_events as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Dispatch Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Events recorded: {}", self.ingest.total_events);
        println!("   ├─ Events/s: {:.2}", self.events_per_sec());
        println!("   └─ Active destinations: {}", self.active_destinations);

        let summary = self.ingest.summary();
        println!("\n📥 Ingest");
        println!("   ├─ Input lines: {}", summary.total_lines);
        println!(
            "   ├─ Decode errors: {} ({:.2}%)",
            summary.decode_errors, summary.error_rate
        );
        println!("   └─ Enqueue wait (ms): {}", summary.enqueue_wait_ms);

        println!("\n📤 Dispatch");
        println!("   ├─ Dispatched: {}", self.dispatch.dispatched_count);
        println!("   ├─ Deliveries: {}", self.dispatch.delivered_count);
        println!("   ├─ Slow deliveries: {}", self.dispatch.slow_delivery_count);
        println!("   └─ Dropped after shutdown: {}", self.dispatch.dropped_count);

        println!();
    }
}
