//! Event - the value fanned out to destinations
//!
//! Producers build an event once; destinations only ever see `&Event`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ContractError, ServiceId};

/// Telemetry event
///
/// Optional fields that are absent are omitted from the JSON encoding.
/// `ip_addr` and `service_id` are always encoded, even when empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name (e.g. "login")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event: Option<String>,

    /// Opaque structured payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,

    /// Numeric identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,

    /// Client-side timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_time: Option<DateTime<Utc>>,

    /// Source IP address
    #[serde(default)]
    ip_addr: String,

    /// Emitting service
    #[serde(default)]
    service_id: ServiceId,
}

impl Event {
    /// Create an event for the given service and source address
    pub fn new(service_id: impl Into<ServiceId>, ip_addr: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            ip_addr: ip_addr.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.event = Some(name.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_client_time(mut self, client_time: DateTime<Utc>) -> Self {
        self.client_time = Some(client_time);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn client_time(&self) -> Option<DateTime<Utc>> {
        self.client_time
    }

    pub fn ip_addr(&self) -> &str {
        &self.ip_addr
    }

    pub fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    /// Canonical JSON encoding of the event
    ///
    /// Never fails: an encoding error yields an empty vector, which callers
    /// must read as "encoding unavailable" rather than as an empty event.
    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decode an event from its JSON encoding
    pub fn from_json(bytes: &[u8]) -> Result<Self, ContractError> {
        serde_json::from_slice(bytes).map_err(|e| ContractError::EventDecode {
            message: e.to_string(),
        })
    }
}
