//! One-time construction of a shared Dispatcher
//!
//! [`DispatcherCell`] is an owned slot that builds its dispatcher on first
//! use; every later caller gets the same instance and their configs are
//! ignored. [`get`] uses a process-wide cell.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::dispatcher::{Dispatcher, DispatcherBuilder, DispatcherConfig};
use crate::error::DispatcherError;

/// Slot holding at most one Dispatcher
pub struct DispatcherCell {
    cell: OnceCell<Arc<Dispatcher>>,
}

impl DispatcherCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// Return the cached dispatcher, building it from `config` if the cell
    /// is empty
    ///
    /// Concurrent first calls are serialized: one of them builds, the others
    /// wait and receive its instance. A failed build leaves the cell empty so
    /// a later call can try again.
    pub async fn get_or_init(
        &self,
        ctx: &CancellationToken,
        config: DispatcherConfig,
    ) -> Result<Arc<Dispatcher>, DispatcherError> {
        if let Some(existing) = self.cell.get() {
            debug!("Dispatcher already initialized, ignoring config");
            return Ok(Arc::clone(existing));
        }

        self.cell
            .get_or_try_init(|| async move {
                DispatcherBuilder::new(config).build(ctx).await.map(Arc::new)
            })
            .await
            .map(Arc::clone)
    }

    /// The cached dispatcher, if one was built
    pub fn get(&self) -> Option<Arc<Dispatcher>> {
        self.cell.get().cloned()
    }
}

impl Default for DispatcherCell {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: DispatcherCell = DispatcherCell::new();

/// Process-wide dispatcher accessor
///
/// The first successful call builds the dispatcher from `config`; all later
/// calls return that instance.
pub async fn get(
    ctx: &CancellationToken,
    config: DispatcherConfig,
) -> Result<Arc<Dispatcher>, DispatcherError> {
    GLOBAL.get_or_init(ctx, config).await
}

/// The process-wide dispatcher, if it has been built
pub fn try_get() -> Option<Arc<Dispatcher>> {
    GLOBAL.get()
}
