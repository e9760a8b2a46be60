//! DestinationHandle - type-erased owner of one destination
//!
//! `Destination` has async methods, so it cannot be used as a trait object
//! directly. The handle boxes each call's future instead, which lets the
//! dispatcher keep destinations of different types in one ordered list.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use contracts::{ContractError, Destination, Event};
use tokio_util::sync::CancellationToken;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

trait ErasedDestination: Send {
    fn setup<'a>(
        &'a mut self,
        ctx: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), ContractError>>;

    fn record<'a>(&'a mut self, ctx: &'a CancellationToken, event: &'a Event) -> BoxFuture<'a, ()>;

    fn teardown<'a>(&'a mut self, ctx: &'a CancellationToken) -> BoxFuture<'a, ()>;
}

impl<D: Destination + Send + 'static> ErasedDestination for D {
    fn setup<'a>(
        &'a mut self,
        ctx: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), ContractError>> {
        Box::pin(Destination::setup(self, ctx))
    }

    fn record<'a>(&'a mut self, ctx: &'a CancellationToken, event: &'a Event) -> BoxFuture<'a, ()> {
        Box::pin(Destination::record(self, ctx, event))
    }

    fn teardown<'a>(&'a mut self, ctx: &'a CancellationToken) -> BoxFuture<'a, ()> {
        Box::pin(Destination::teardown(self, ctx))
    }
}

/// Handle to a destination owned by the dispatcher
pub struct DestinationHandle {
    name: String,
    inner: Box<dyn ErasedDestination>,
}

impl DestinationHandle {
    /// Wrap a destination
    pub fn new<D: Destination + Send + 'static>(destination: D) -> Self {
        let name = Destination::name(&destination).to_string();
        Self {
            name,
            inner: Box::new(destination),
        }
    }

    /// Destination name, captured at wrap time
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) async fn setup(&mut self, ctx: &CancellationToken) -> Result<(), ContractError> {
        self.inner.setup(ctx).await
    }

    pub(crate) async fn record(&mut self, ctx: &CancellationToken, event: &Event) {
        self.inner.record(ctx, event).await
    }

    pub(crate) async fn teardown(&mut self, ctx: &CancellationToken) {
        self.inner.teardown(ctx).await
    }
}

impl fmt::Debug for DestinationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
