//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Contents
//! - [`Event`]: the immutable telemetry value fanned out by the dispatcher
//! - [`Destination`]: the capability a sink must implement
//! - [`MonzaBlueprint`]: declarative configuration schema
//! - [`ContractError`]: layered error type

mod blueprint;
mod destination;
mod error;
mod event;
mod service_id;

pub use blueprint::*;
pub use destination::{Destination, LocalDestination};
pub use error::*;
pub use event::Event;
pub use service_id::ServiceId;

/// Cancellation context handed to every destination call.
pub use tokio_util::sync::CancellationToken;
