//! Dispatch metrics for observability
//!
//! Destinations have no error channel back to the dispatcher, so these
//! counters are the only way to see stalls and losses from the outside.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for one dispatcher
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Approximate number of queued events
    queue_len: AtomicUsize,
    /// Events accepted by `record`
    recorded_count: AtomicU64,
    /// Events dequeued by the fan-out loop
    dispatched_count: AtomicU64,
    /// Completed `record` calls across all destinations
    delivered_count: AtomicU64,
    /// Events rejected because the loop had stopped
    dropped_count: AtomicU64,
    /// Deliveries slower than the configured threshold
    slow_delivery_count: AtomicU64,
    /// Successful registrations
    registered_count: AtomicU64,
    /// Rejected registrations
    setup_failure_count: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn recorded_count(&self) -> u64 {
        self.recorded_count.load(Ordering::Relaxed)
    }

    pub fn inc_recorded_count(&self) {
        self.recorded_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dispatched_count(&self) -> u64 {
        self.dispatched_count.load(Ordering::Relaxed)
    }

    pub fn inc_dispatched_count(&self) {
        self.dispatched_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered_count.load(Ordering::Relaxed)
    }

    pub fn inc_delivered_count(&self) {
        self.delivered_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn slow_delivery_count(&self) -> u64 {
        self.slow_delivery_count.load(Ordering::Relaxed)
    }

    pub fn inc_slow_delivery_count(&self) {
        self.slow_delivery_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn registered_count(&self) -> u64 {
        self.registered_count.load(Ordering::Relaxed)
    }

    pub fn inc_registered_count(&self) {
        self.registered_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn setup_failure_count(&self) -> u64 {
        self.setup_failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_setup_failure_count(&self) {
        self.setup_failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            recorded_count: self.recorded_count(),
            dispatched_count: self.dispatched_count(),
            delivered_count: self.delivered_count(),
            dropped_count: self.dropped_count(),
            slow_delivery_count: self.slow_delivery_count(),
            registered_count: self.registered_count(),
            setup_failure_count: self.setup_failure_count(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub recorded_count: u64,
    pub dispatched_count: u64,
    pub delivered_count: u64,
    pub dropped_count: u64,
    pub slow_delivery_count: u64,
    pub registered_count: u64,
    pub setup_failure_count: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Recorded events: {}", self.recorded_count)?;
        writeln!(f, "Dispatched events: {}", self.dispatched_count)?;
        writeln!(f, "Deliveries: {}", self.delivered_count)?;
        writeln!(f, "Dropped after shutdown: {}", self.dropped_count)?;
        writeln!(f, "Slow deliveries: {}", self.slow_delivery_count)?;
        writeln!(
            f,
            "Destinations: {} registered, {} rejected",
            self.registered_count, self.setup_failure_count
        )
    }
}
