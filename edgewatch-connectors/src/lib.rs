//! Host Transports for EdgeWatch
//!
//! Implementations of the `edgewatch-core` seams for nodes running on a
//! regular operating system:
//!
//! | Module    | Seam                          | Backend  |
//! |-----------|-------------------------------|----------|
//! | `mqtt`    | `BusSession`                  | rumqttc  |
//! | `http`    | `EventSink` + `ConfigSource`  | ureq     |
//! | `network` | `NetworkLink`                 | std::net |
//!
//! Every transport is synchronous. The control loop is single-threaded and
//! already tolerates blocking during (re)connection, so there is no async
//! runtime to host.
//!
//! ## Failure mapping
//!
//! Transport errors stay rich inside this crate (`thiserror` enums with the
//! underlying message) and are collapsed to the small `Copy` error types of
//! the core at the seam. The core only needs the category to decide what to
//! log; the detail is logged here before it is dropped.
//!
//! ```no_run
//! use edgewatch_connectors::http::{CollectorClient, HttpConfig};
//! use edgewatch_connectors::mqtt::{MqttConfig, MqttSession};
//!
//! let bus = MqttSession::new(MqttConfig::new("test.mosquitto.org", 1883))?;
//! let collector = CollectorClient::new(HttpConfig::new("http://127.0.0.1:5000").timeout_secs(5))?;
//! # Ok::<(), edgewatch_connectors::ConnectorError>(())
//! ```

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "http")]
pub mod http;

pub mod network;

// Re-export common types
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttSession};

#[cfg(feature = "http")]
pub use http::{CollectorClient, HttpConfig, HttpError};

pub use network::HostNetwork;

use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Operation needs an established session
    #[error("Not connected")]
    NotConnected,

    /// No answer within the configured timeout
    #[error("Timeout")]
    Timeout,

    /// Rejected by the remote end or the protocol stack
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Invalid connector configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total messages failed to send
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Number of sessions established after the first
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    pub(crate) fn record_sent(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    pub(crate) fn record_failure(&mut self, error: impl ToString) {
        self.messages_failed += 1;
        self.last_error = Some(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accounting() {
        let mut stats = ConnectionStats::default();
        stats.record_sent(12);
        stats.record_sent(3);
        stats.record_failure(ConnectorError::Timeout);

        assert_eq!(stats.messages_sent, 2);
        assert_eq!(stats.bytes_sent, 15);
        assert_eq!(stats.messages_failed, 1);
        assert_eq!(stats.last_error.as_deref(), Some("Timeout"));
    }
}
