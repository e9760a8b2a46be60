//! NetworkDestination - UDP fire-and-forget streaming

use contracts::{ContractError, Destination, Event};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

/// Configuration for NetworkDestination
#[derive(Debug, Clone)]
pub struct NetworkDestinationConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Max datagram size (UDP typically 65507 for IPv4)
    pub max_packet_size: usize,
}

impl NetworkDestinationConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        Ok(Self {
            addr,
            max_packet_size,
        })
    }
}

/// Destination that sends each event as one JSON datagram
pub struct NetworkDestination {
    name: String,
    config: NetworkDestinationConfig,
    socket: Option<UdpSocket>,
}

impl NetworkDestination {
    pub fn new(name: impl Into<String>, config: NetworkDestinationConfig) -> Self {
        Self {
            name: name.into(),
            config,
            socket: None,
        }
    }

    /// Create from params (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, String> {
        let config = NetworkDestinationConfig::from_params(params)?;
        Ok(Self::new(name, config))
    }

    fn local_bind_addr(&self) -> &'static str {
        if self.config.addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        }
    }

    async fn connect(&self) -> std::io::Result<UdpSocket> {
        let socket = UdpSocket::bind(self.local_bind_addr()).await?;
        socket.connect(&self.config.addr).await?;
        Ok(socket)
    }

    fn prepare_payload(&self, event: &Event) -> Option<Vec<u8>> {
        let data = event.to_json();
        if data.is_empty() {
            warn!(destination = %self.name, event = ?event.name(), "Event encoding unavailable");
            return None;
        }

        if data.len() > self.config.max_packet_size {
            warn!(
                destination = %self.name,
                size = data.len(),
                max = self.config.max_packet_size,
                "Packet too large, event skipped"
            );
            return None;
        }

        Some(data)
    }
}

impl Destination for NetworkDestination {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_destination_setup",
        skip(self, _ctx),
        fields(destination = %self.name, target = %self.config.addr)
    )]
    async fn setup(&mut self, _ctx: &CancellationToken) -> Result<(), ContractError> {
        let socket = self
            .connect()
            .await
            .map_err(|e| ContractError::destination_connection(&self.name, e.to_string()))?;
        debug!(destination = %self.name, "NetworkDestination connected");
        self.socket = Some(socket);
        Ok(())
    }

    async fn record(&mut self, _ctx: &CancellationToken, event: &Event) {
        let Some(socket) = self.socket.as_ref() else {
            warn!(destination = %self.name, "NetworkDestination not connected, event skipped");
            return;
        };
        let Some(data) = self.prepare_payload(event) else {
            return;
        };

        match socket.send(&data).await {
            Ok(sent) => {
                debug!(destination = %self.name, bytes = sent, "Sent");
            }
            Err(e) => {
                // UDP is best-effort
                error!(destination = %self.name, error = %e, "UDP send failed");
            }
        }
    }

    #[instrument(name = "network_destination_teardown", skip(self, _ctx))]
    async fn teardown(&mut self, _ctx: &CancellationToken) {
        self.socket = None;
        debug!(destination = %self.name, "NetworkDestination closed");
    }
}
