//! MQTT bus session over rumqttc
//!
//! Uses the synchronous `Client`/`Connection` pair. The connection has to be
//! driven for anything to reach the wire, so:
//!
//! - `connect` drives it until the broker's CONNACK (or a failure) within
//!   the connect timeout;
//! - `service` drains pending events for at most a small time slice, which
//!   also flushes publishes queued since the previous tick.
//!
//! Publishes use QoS 0: losing a report is acceptable, stalling the loop on
//! an acknowledgement is not.

use std::time::{Duration, Instant};

use edgewatch_core::{BusSession, ConnectFailure, PublishError};
use log::{debug, info, warn};
use rumqttc::{
    Client, ConnectReturnCode, Connection, ConnectionError, Event, MqttOptions, Packet, QoS,
    RecvTimeoutError,
};

use crate::{ConnectionStats, ConnectorError};

/// Events handled per `service` call at most
const SERVICE_BUDGET: usize = 16;

/// MQTT configuration
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker host name or address
    pub host: String,
    /// Broker TCP port
    pub port: u16,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// Upper bound for the CONNECT/CONNACK exchange
    pub connect_timeout: Duration,
    /// Time slice for one `service` call
    pub service_slice: Duration,
    /// Outgoing request queue capacity
    pub queue_capacity: usize,
    /// Largest accepted payload in bytes
    pub max_payload: usize,
}

impl MqttConfig {
    /// Create new configuration for `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            keep_alive: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            service_slice: Duration::from_millis(10),
            queue_capacity: 16,
            max_payload: 1024,
        }
    }

    /// Set keep-alive interval in seconds
    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive = Duration::from_secs(secs);
        self
    }

    /// Set connect timeout in seconds
    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout = Duration::from_secs(secs);
        self
    }

    /// Set outgoing queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

/// Map a CONNACK return code onto the core failure taxonomy
pub fn classify_return_code(code: ConnectReturnCode) -> ConnectFailure {
    match code {
        ConnectReturnCode::RefusedProtocolVersion => ConnectFailure::ProtocolMismatch,
        ConnectReturnCode::BadClientId => ConnectFailure::IdentityRejected,
        ConnectReturnCode::ServiceUnavailable => ConnectFailure::BrokerUnavailable,
        ConnectReturnCode::BadUserNamePassword => ConnectFailure::BadCredentials,
        ConnectReturnCode::NotAuthorized => ConnectFailure::NotAuthorized,
        ConnectReturnCode::Success => ConnectFailure::Unknown,
    }
}

/// Map a connection error onto the core failure taxonomy
pub fn classify_connection_error(error: &ConnectionError) -> ConnectFailure {
    match error {
        ConnectionError::ConnectionRefused(code) => classify_return_code(*code),
        ConnectionError::Io(_) | ConnectionError::NetworkTimeout => ConnectFailure::Transport,
        _ => ConnectFailure::Unknown,
    }
}

/// Bus session backed by rumqttc
pub struct MqttSession {
    config: MqttConfig,
    link: Option<(Client, Connection)>,
    connected: bool,
    sessions: u32,
    stats: ConnectionStats,
}

impl MqttSession {
    /// Create a disconnected session
    pub fn new(config: MqttConfig) -> Result<Self, ConnectorError> {
        if config.host.is_empty() {
            return Err(ConnectorError::ConfigError("Broker host must not be empty".into()));
        }
        if config.port == 0 {
            return Err(ConnectorError::ConfigError("Broker port must not be 0".into()));
        }
        if config.queue_capacity == 0 {
            return Err(ConnectorError::ConfigError("Queue capacity must be at least 1".into()));
        }

        Ok(Self {
            config,
            link: None,
            connected: false,
            sessions: 0,
            stats: ConnectionStats::default(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }

    fn await_connack(&mut self) -> Result<(), ConnectFailure> {
        let deadline = Instant::now() + self.config.connect_timeout;
        let Some((_, connection)) = self.link.as_mut() else {
            return Err(ConnectFailure::Unknown);
        };

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!("mqtt: no CONNACK within {:?}", self.config.connect_timeout);
                return Err(ConnectFailure::Transport);
            }

            match connection.recv_timeout(remaining) {
                Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                    return match ack.code {
                        ConnectReturnCode::Success => Ok(()),
                        code => Err(classify_return_code(code)),
                    };
                }
                Ok(Ok(event)) => debug!("mqtt: {:?} while connecting", event),
                Ok(Err(err)) => {
                    warn!("mqtt: connect error: {}", err);
                    return Err(classify_connection_error(&err));
                }
                Err(RecvTimeoutError::Timeout) => return Err(ConnectFailure::Transport),
                Err(RecvTimeoutError::Disconnected) => return Err(ConnectFailure::Unknown),
            }
        }
    }

    fn drop_link(&mut self) {
        if let Some((client, _)) = self.link.take() {
            let _ = client.try_disconnect();
        }
        self.connected = false;
    }
}

impl BusSession for MqttSession {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self, client_id: &str) -> Result<(), ConnectFailure> {
        self.drop_link();

        let mut options = MqttOptions::new(client_id, self.config.host.as_str(), self.config.port);
        options.set_keep_alive(self.config.keep_alive);
        options.set_clean_session(true);
        self.link = Some(Client::new(options, self.config.queue_capacity));

        info!("mqtt: connecting to {}:{}", self.config.host, self.config.port);
        match self.await_connack() {
            Ok(()) => {
                self.connected = true;
                self.sessions += 1;
                if self.sessions > 1 {
                    self.stats.reconnections += 1;
                }
                Ok(())
            }
            Err(reason) => {
                self.stats.last_error = Some(reason.to_string());
                self.drop_link();
                Err(reason)
            }
        }
    }

    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError> {
        if !self.connected {
            return Err(PublishError::NotConnected);
        }
        if payload.len() > self.config.max_payload {
            self.stats.record_failure(PublishError::PayloadTooLarge);
            return Err(PublishError::PayloadTooLarge);
        }
        let Some((client, _)) = self.link.as_ref() else {
            return Err(PublishError::NotConnected);
        };

        match client.try_publish(topic, QoS::AtMostOnce, retain, payload.as_bytes().to_vec()) {
            Ok(()) => {
                self.stats.record_sent(payload.len());
                Ok(())
            }
            Err(err) => {
                debug!("mqtt: publish to {} rejected: {}", topic, err);
                self.stats.record_failure(err);
                Err(PublishError::QueueFull)
            }
        }
    }

    fn service(&mut self) {
        if !self.connected {
            return;
        }
        let slice = self.config.service_slice;
        let Some((_, connection)) = self.link.as_mut() else {
            return;
        };

        let mut lost = None;
        for _ in 0..SERVICE_BUDGET {
            match connection.recv_timeout(slice) {
                Ok(Ok(Event::Incoming(Packet::Disconnect))) => {
                    lost = Some("broker sent DISCONNECT".to_string());
                    break;
                }
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    lost = Some(err.to_string());
                    break;
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    lost = Some("event loop closed".to_string());
                    break;
                }
            }
        }

        if let Some(reason) = lost {
            warn!("mqtt: session lost: {}", reason);
            self.stats.last_error = Some(reason);
            self.drop_link();
        }
    }

    fn disconnect(&mut self) {
        if self.link.is_some() {
            info!("mqtt: disconnecting");
        }
        self.drop_link();
    }
}
