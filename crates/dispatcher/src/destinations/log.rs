//! LogDestination - logs event summary via tracing

use contracts::{ContractError, Destination, Event};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Destination that logs one line per event
pub struct LogDestination {
    name: String,
    logged: u64,
}

impl LogDestination {
    /// Create a new LogDestination with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logged: 0,
        }
    }

    /// Number of events logged so far
    pub fn logged(&self) -> u64 {
        self.logged
    }

    fn log_event_summary(&self, event: &Event) {
        info!(
            destination = %self.name,
            event = ?event.name(),
            service_id = %event.service_id(),
            ip_addr = %event.ip_addr(),
            id = ?event.id(),
            client_time = ?event.client_time(),
            has_data = event.data().is_some(),
            "Event received"
        );
    }
}

impl Destination for LogDestination {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_destination_setup", skip(self, _ctx), fields(destination = %self.name))]
    async fn setup(&mut self, _ctx: &CancellationToken) -> Result<(), ContractError> {
        Ok(())
    }

    async fn record(&mut self, _ctx: &CancellationToken, event: &Event) {
        self.log_event_summary(event);
        self.logged += 1;
    }

    #[instrument(name = "log_destination_teardown", skip(self, _ctx))]
    async fn teardown(&mut self, _ctx: &CancellationToken) {
        info!(destination = %self.name, logged = self.logged, "LogDestination closed");
    }
}
