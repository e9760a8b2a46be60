//! Dispatcher error types

use thiserror::Error;

use contracts::ContractError;

/// Dispatcher-specific errors
///
/// Only setup failures and lifecycle misuse reach callers; delivery failures
/// stay inside destinations.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Destination rejected setup and was not registered
    #[error("destination '{name}' failed setup: {source}")]
    DestinationSetup {
        name: String,
        #[source]
        source: ContractError,
    },

    /// Destination could not be built from configuration
    #[error("failed to create destination '{name}': {message}")]
    DestinationCreation { name: String, message: String },

    /// Dispatcher has been torn down
    #[error("dispatcher is shut down")]
    ShutDown,

    /// Teardown already ran
    #[error("dispatcher already torn down")]
    AlreadyTornDown,

    /// Contract error
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),
}

impl DispatcherError {
    pub fn destination_setup(name: impl Into<String>, source: ContractError) -> Self {
        Self::DestinationSetup {
            name: name.into(),
            source,
        }
    }

    pub fn destination_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DestinationCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
