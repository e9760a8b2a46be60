//! Dispatcher - ingress queue and fan-out loop
//!
//! One background task per dispatcher drains a bounded queue and delivers
//! each event to every active destination, one destination at a time, in
//! registration order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    default_queue_capacity, Destination, Event, MonzaBlueprint, MAX_QUEUE_CAPACITY,
};

use crate::destinations::create_destination;
use crate::error::DispatcherError;
use crate::handle::DestinationHandle;
use crate::metrics::{DispatchMetrics, MetricsSnapshot};

/// Deliveries slower than this are reported as stalls
pub const DEFAULT_SLOW_DELIVERY_THRESHOLD: Duration = Duration::from_secs(1);

/// Dispatcher configuration
pub struct DispatcherConfig {
    /// Address the emitting process is bound to
    pub bind_address: String,
    /// Initial destinations, set up in order at build time
    pub destinations: Vec<DestinationHandle>,
    /// Ingress queue capacity, clamped to `1..=MAX_QUEUE_CAPACITY`
    pub queue_capacity: usize,
    /// Per-destination delivery time above which a stall is reported
    pub slow_delivery_threshold: Duration,
}

impl DispatcherConfig {
    /// Create a config with no initial destinations
    pub fn new(bind_address: impl Into<String>) -> Self {
        Self {
            bind_address: bind_address.into(),
            destinations: Vec::new(),
            queue_capacity: default_queue_capacity(),
            slow_delivery_threshold: DEFAULT_SLOW_DELIVERY_THRESHOLD,
        }
    }

    /// Build a config from a declarative blueprint
    ///
    /// Destinations are constructed here but only set up when the dispatcher
    /// is built.
    pub fn from_blueprint(blueprint: &MonzaBlueprint) -> Result<Self, DispatcherError> {
        let destinations = blueprint
            .destinations
            .iter()
            .map(create_destination)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            bind_address: blueprint.bind_address.clone(),
            destinations,
            queue_capacity: blueprint.queue_capacity,
            slow_delivery_threshold: DEFAULT_SLOW_DELIVERY_THRESHOLD,
        })
    }

    pub fn with_destination<D: Destination + Send + 'static>(self, destination: D) -> Self {
        self.with_handle(DestinationHandle::new(destination))
    }

    pub fn with_handle(mut self, handle: DestinationHandle) -> Self {
        self.destinations.push(handle);
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_slow_delivery_threshold(mut self, threshold: Duration) -> Self {
        self.slow_delivery_threshold = threshold;
        self
    }
}

impl std::fmt::Debug for DispatcherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherConfig")
            .field("bind_address", &self.bind_address)
            .field("destinations", &self.destinations)
            .field("queue_capacity", &self.queue_capacity)
            .field("slow_delivery_threshold", &self.slow_delivery_threshold)
            .finish()
    }
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig) -> Self {
        Self { config }
    }

    /// Start the fan-out loop and register the initial destinations
    ///
    /// `ctx` is handed to every `setup` and `record` call. Only `teardown`
    /// stops the loop; cancelling `ctx` does not. If an initial destination
    /// fails setup, the ones already registered are torn down and the error
    /// is returned.
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self, ctx),
        fields(
            bind_address = %self.config.bind_address,
            destinations = self.config.destinations.len()
        )
    )]
    pub async fn build(self, ctx: &CancellationToken) -> Result<Dispatcher, DispatcherError> {
        let DispatcherConfig {
            bind_address,
            destinations,
            queue_capacity,
            slow_delivery_threshold,
        } = self.config;

        let dispatcher = Dispatcher::start(
            bind_address,
            queue_capacity,
            slow_delivery_threshold,
            ctx,
        );

        for destination in destinations {
            if let Err(e) = dispatcher.register_handle(ctx, destination).await {
                if let Err(teardown_err) = dispatcher.teardown(ctx).await {
                    debug!(error = %teardown_err, "Teardown after failed build");
                }
                return Err(e);
            }
        }

        Ok(dispatcher)
    }
}

/// Destination list shared with the fan-out loop
#[derive(Default)]
struct ActiveSet {
    destinations: Vec<DestinationHandle>,
    closed: bool,
}

/// Process-local event dispatcher
pub struct Dispatcher {
    bind_address: String,
    queue_capacity: usize,
    tx: mpsc::Sender<Event>,
    active: Arc<Mutex<ActiveSet>>,
    stop: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    fn start(
        bind_address: String,
        queue_capacity: usize,
        slow_delivery_threshold: Duration,
        ctx: &CancellationToken,
    ) -> Self {
        let queue_capacity = queue_capacity.clamp(1, MAX_QUEUE_CAPACITY);
        let (tx, rx) = mpsc::channel(queue_capacity);
        let active = Arc::new(Mutex::new(ActiveSet::default()));
        // Owned by the dispatcher; the caller's context never stops the loop.
        let stop = CancellationToken::new();
        let metrics = Arc::new(DispatchMetrics::new());

        let fan_out = FanOutLoop {
            rx,
            active: Arc::clone(&active),
            stop: stop.clone(),
            ctx: ctx.clone(),
            metrics: Arc::clone(&metrics),
            slow_delivery_threshold,
        };
        let worker = tokio::spawn(fan_out.run());

        info!(
            bind_address = %bind_address,
            queue_capacity,
            "Dispatcher started"
        );

        Self {
            bind_address,
            queue_capacity,
            tx,
            active,
            stop,
            worker: Mutex::new(Some(worker)),
            metrics,
        }
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// True once teardown has started
    pub fn is_shut_down(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Names of the active destinations, in registration order
    pub async fn destination_names(&self) -> Vec<String> {
        self.active
            .lock()
            .await
            .destinations
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    /// Set up a destination and append it to the active list
    ///
    /// # Errors
    /// - [`DispatcherError::DestinationSetup`] when setup fails; the
    ///   destination is not added
    /// - [`DispatcherError::ShutDown`] after teardown
    pub async fn register_destination<D: Destination + Send + 'static>(
        &self,
        ctx: &CancellationToken,
        destination: D,
    ) -> Result<(), DispatcherError> {
        self.register_handle(ctx, DestinationHandle::new(destination))
            .await
    }

    /// Same as [`register_destination`](Self::register_destination) for an
    /// already wrapped destination
    #[instrument(
        name = "dispatcher_register_destination",
        skip(self, ctx, destination),
        fields(destination = %destination.name())
    )]
    pub async fn register_handle(
        &self,
        ctx: &CancellationToken,
        mut destination: DestinationHandle,
    ) -> Result<(), DispatcherError> {
        if self.is_shut_down() {
            return Err(DispatcherError::ShutDown);
        }

        if let Err(e) = destination.setup(ctx).await {
            self.metrics.inc_setup_failure_count();
            metrics::counter!("monza_destination_setup_failures_total").increment(1);
            warn!(destination = %destination.name(), error = %e, "Destination setup failed");
            return Err(DispatcherError::destination_setup(destination.name(), e));
        }

        let mut active = self.active.lock().await;
        if active.closed {
            drop(active);
            // Set up but never registered: release it here.
            destination.teardown(ctx).await;
            return Err(DispatcherError::ShutDown);
        }

        active.destinations.push(destination);
        self.metrics.inc_registered_count();
        metrics::gauge!("monza_destinations_active").set(active.destinations.len() as f64);
        info!(position = active.destinations.len(), "Destination registered");
        Ok(())
    }

    /// Enqueue an event for fan-out
    ///
    /// Waits while the queue is full. After teardown the event is dropped.
    pub async fn record(&self, event: Event) {
        match self.tx.send(event).await {
            Ok(()) => self.on_recorded(),
            Err(mpsc::error::SendError(event)) => self.on_dropped(&event),
        }
    }

    /// Blocking variant of [`record`](Self::record) for threads outside the
    /// async runtime
    ///
    /// # Panics
    /// Panics when called from within an async execution context.
    pub fn record_blocking(&self, event: Event) {
        match self.tx.blocking_send(event) {
            Ok(()) => self.on_recorded(),
            Err(mpsc::error::SendError(event)) => self.on_dropped(&event),
        }
    }

    fn on_recorded(&self) {
        self.metrics.inc_recorded_count();
        self.metrics.set_queue_len(self.queue_capacity - self.tx.capacity());
        metrics::counter!("monza_events_recorded_total").increment(1);
    }

    fn on_dropped(&self, event: &Event) {
        self.metrics.inc_dropped_count();
        metrics::counter!("monza_events_dropped_total").increment(1);
        debug!(event = ?event.name(), "Dispatcher stopped, event dropped");
    }

    /// Stop the fan-out loop, then tear down every destination in
    /// registration order
    ///
    /// An event the loop already dequeued is delivered to all destinations
    /// before the loop exits; events still queued are discarded.
    ///
    /// # Errors
    /// [`DispatcherError::AlreadyTornDown`] on every call after the first.
    #[instrument(name = "dispatcher_teardown", skip(self, ctx))]
    pub async fn teardown(&self, ctx: &CancellationToken) -> Result<(), DispatcherError> {
        let mut worker = self.worker.lock().await;
        let Some(handle) = worker.take() else {
            return Err(DispatcherError::AlreadyTornDown);
        };

        self.stop.cancel();
        if let Err(e) = handle.await {
            error!(error = ?e, "Fan-out loop panicked");
        }

        let destinations = {
            let mut active = self.active.lock().await;
            active.closed = true;
            std::mem::take(&mut active.destinations)
        };

        for mut destination in destinations {
            destination.teardown(ctx).await;
            debug!(destination = %destination.name(), "Destination torn down");
        }
        metrics::gauge!("monza_destinations_active").set(0.0);

        info!(
            recorded = self.metrics.recorded_count(),
            dispatched = self.metrics.dispatched_count(),
            "Dispatcher teardown complete"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("bind_address", &self.bind_address)
            .field("queue_capacity", &self.queue_capacity)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

/// State owned by the background task
struct FanOutLoop {
    rx: mpsc::Receiver<Event>,
    active: Arc<Mutex<ActiveSet>>,
    stop: CancellationToken,
    ctx: CancellationToken,
    metrics: Arc<DispatchMetrics>,
    slow_delivery_threshold: Duration,
}

impl FanOutLoop {
    #[instrument(name = "dispatcher_fan_out_loop", skip(self))]
    async fn run(mut self) {
        debug!("Fan-out loop started");

        let mut event_count: u64 = 0;

        loop {
            // Stop wins over a queued event; a dequeued event is always
            // delivered in full before the next check.
            let event = tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                received = self.rx.recv() => match received {
                    Some(event) => event,
                    None => break,
                },
            };

            event_count += 1;
            self.metrics.inc_dispatched_count();
            self.metrics.set_queue_len(self.rx.len());
            self.deliver(&event).await;

            if event_count % 100 == 0 {
                debug!(events = event_count, "Fan-out progress");
            }
        }

        debug!(events = event_count, "Fan-out loop stopped");
    }

    async fn deliver(&self, event: &Event) {
        // Held across every `record`; registration waits for the whole event.
        let mut active = self.active.lock().await;

        for destination in active.destinations.iter_mut() {
            let started = Instant::now();
            destination.record(&self.ctx, event).await;
            let elapsed = started.elapsed();

            self.metrics.inc_delivered_count();
            metrics::histogram!(
                "monza_destination_record_seconds",
                "destination" => destination.name().to_string()
            )
            .record(elapsed.as_secs_f64());

            if elapsed >= self.slow_delivery_threshold {
                self.metrics.inc_slow_delivery_count();
                warn!(
                    destination = %destination.name(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Slow delivery is holding up the fan-out loop"
                );
            }
        }
    }
}
