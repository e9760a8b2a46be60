//! Configuration validation
//!
//! Rules:
//! - bind_address is not empty
//! - 1 <= queue_capacity <= MAX_QUEUE_CAPACITY
//! - destination names are non-empty and unique
//! - network destinations carry an `addr` parameter

use std::collections::HashSet;

use contracts::{ContractError, DestinationType, MonzaBlueprint, MAX_QUEUE_CAPACITY};

/// Validate a MonzaBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &MonzaBlueprint) -> Result<(), ContractError> {
    validate_bind_address(blueprint)?;
    validate_queue_capacity(blueprint)?;
    validate_destination_names(blueprint)?;
    validate_destination_params(blueprint)?;
    Ok(())
}

fn validate_bind_address(blueprint: &MonzaBlueprint) -> Result<(), ContractError> {
    if blueprint.bind_address.trim().is_empty() {
        return Err(ContractError::config_validation(
            "bind_address",
            "bind_address cannot be empty",
        ));
    }
    Ok(())
}

fn validate_queue_capacity(blueprint: &MonzaBlueprint) -> Result<(), ContractError> {
    if blueprint.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "queue_capacity",
            "queue_capacity must be >= 1",
        ));
    }
    if blueprint.queue_capacity > MAX_QUEUE_CAPACITY {
        return Err(ContractError::config_validation(
            "queue_capacity",
            format!("queue_capacity must be <= {}", MAX_QUEUE_CAPACITY),
        ));
    }
    Ok(())
}

fn validate_destination_names(blueprint: &MonzaBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, destination) in blueprint.destinations.iter().enumerate() {
        if destination.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("destinations[{}].name", idx),
                "destination name cannot be empty",
            ));
        }
        if !seen.insert(destination.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("destinations[name={}]", destination.name),
                "duplicate destination name",
            ));
        }
    }
    Ok(())
}

fn validate_destination_params(blueprint: &MonzaBlueprint) -> Result<(), ContractError> {
    for destination in &blueprint.destinations {
        if destination.destination_type == DestinationType::Network
            && !destination.params.contains_key("addr")
        {
            return Err(ContractError::config_validation(
                format!("destinations[{}].params.addr", destination.name),
                "network destination requires 'addr'",
            ));
        }
    }
    Ok(())
}
