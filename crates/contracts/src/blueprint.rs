//! MonzaBlueprint - declarative dispatcher configuration
//!
//! Parsed by `config_loader`, turned into live destinations by `dispatcher`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonzaBlueprint {
    /// Address the emitting process is bound to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Ingress queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Initial destinations, in registration order
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
}

impl Default for MonzaBlueprint {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            queue_capacity: default_queue_capacity(),
            destinations: Vec::new(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

/// Default ingress capacity: a single pending slot
pub fn default_queue_capacity() -> usize {
    1
}

/// Largest accepted ingress capacity
pub const MAX_QUEUE_CAPACITY: usize = 1 << 20;

/// Destination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Destination name
    pub name: String,

    /// Destination type
    pub destination_type: DestinationType,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Destination type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationType {
    /// Structured log line per event
    Log,
    /// JSON lines appended to a file
    File,
    /// UDP datagrams
    Network,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let bp: MonzaBlueprint = serde_json::from_str("{}").unwrap();
        assert_eq!(bp.bind_address, "127.0.0.1");
        assert_eq!(bp.queue_capacity, 1);
        assert!(bp.destinations.is_empty());
    }

    #[test]
    fn test_destination_type_snake_case() {
        let cfg: DestinationConfig =
            serde_json::from_str(r#"{"name":"udp","destination_type":"network"}"#).unwrap();
        assert_eq!(cfg.destination_type, DestinationType::Network);
        assert!(cfg.params.is_empty());
    }
}
