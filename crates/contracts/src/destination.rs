//! Destination trait - Dispatcher output interface
//!
//! Lifecycle: `setup` once, `record` any number of times, `teardown` once.
//! Only the dispatcher calls these methods.

use tokio_util::sync::CancellationToken;

use crate::{ContractError, Event};

/// Event sink capability
///
/// All destination implementations must implement this trait.
#[trait_variant::make(Destination: Send)]
pub trait LocalDestination {
    /// Destination name (used for logging/metrics)
    fn name(&self) -> &str;

    /// One-time initialization, e.g. opening a connection
    ///
    /// # Errors
    /// A failed setup keeps the destination out of the dispatcher.
    async fn setup(&mut self, ctx: &CancellationToken) -> Result<(), ContractError>;

    /// Best-effort delivery of one event
    ///
    /// Failures stay inside the destination. Implementations must not block
    /// indefinitely: the dispatcher waits for this call before delivering to
    /// the next destination.
    ///
    /// The dispatcher holds its destination list while this runs, so a
    /// `record` call must not register destinations on the same dispatcher.
    /// That call would wait on the list forever. Recording back into the
    /// same dispatcher can wait forever too once its queue is full.
    async fn record(&mut self, ctx: &CancellationToken, event: &Event);

    /// Release resources; called once during dispatcher shutdown
    async fn teardown(&mut self, ctx: &CancellationToken);
}
