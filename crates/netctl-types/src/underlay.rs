use serde::{Deserialize, Serialize};

/// A locally supervised relay worker paired with a WireGuard interface.
///
/// Persists across ticks but is torn down and recreated whenever the mode
/// or its relevant ports change (see the reconciliation controller's
/// underlay state machine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LocalUnderlayState {
    /// This node dials out to a relay server.
    Client {
        /// Name of the supervised systemd unit running `gost`.
        unit_name: String,
        /// Local UDP port the WireGuard peer now targets via loopback.
        listen_port: u16,
        /// Relay server host, resolved once at creation time.
        server_ip: String,
        /// Relay server port.
        server_port: u16,
    },
    /// This node accepts relayed connections.
    Server {
        /// Name of the supervised systemd unit running `gost`.
        unit_name: String,
        /// Port the relay listens on for incoming `relay+tls` connections.
        listen_port: u16,
    },
}

impl LocalUnderlayState {
    /// The supervised unit name backing this underlay, regardless of mode.
    #[must_use]
    pub fn unit_name(&self) -> &str {
        match self {
            LocalUnderlayState::Client { unit_name, .. }
            | LocalUnderlayState::Server { unit_name, .. } => unit_name,
        }
    }
}
