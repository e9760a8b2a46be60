//! Destination implementations
//!
//! Contains LogDestination, FileDestination, and NetworkDestination, plus the
//! factory that builds them from configuration.

mod file;
mod log;
mod network;

pub use self::file::{FileDestination, FileDestinationConfig};
pub use self::log::LogDestination;
pub use self::network::{NetworkDestination, NetworkDestinationConfig};

use contracts::{DestinationConfig, DestinationType};
use tracing::instrument;

use crate::error::DispatcherError;
use crate::handle::DestinationHandle;

/// Create a DestinationHandle from configuration
///
/// Nothing is opened here; connections and files are acquired in `setup`.
#[instrument(
    name = "dispatcher_create_destination",
    skip(config),
    fields(destination = %config.name, destination_type = ?config.destination_type)
)]
pub fn create_destination(config: &DestinationConfig) -> Result<DestinationHandle, DispatcherError> {
    match config.destination_type {
        DestinationType::Log => Ok(DestinationHandle::new(LogDestination::new(&config.name))),
        DestinationType::File => {
            let destination = FileDestination::from_params(&config.name, &config.params);
            Ok(DestinationHandle::new(destination))
        }
        DestinationType::Network => {
            let destination = NetworkDestination::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::destination_creation(&config.name, e))?;
            Ok(DestinationHandle::new(destination))
        }
    }
}
