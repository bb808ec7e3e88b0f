//! Connectivity Supervisor
//!
//! Owns the [`ConnectivityState`] and drives it forward one bounded step per
//! call to [`ConnectivitySupervisor::poll`]:
//!
//! ```text
//!                 link up                 session established
//!  Disconnected ──────────▶ NetworkUp ─────────────────────────▶ BusConnected
//!       ▲                      ▲  │ connect failed:                   │
//!       │                      │  └─ wait backoff, retry ◀──┐         │
//!       │                      └────── session lost ────────┴─────────┤
//!       └───────────────────────────── link lost ─────────────────────┘
//! ```
//!
//! The bus is never attempted before the network is up, and losing the
//! network from any state drops straight back to `Disconnected`.
//!
//! `poll` never sleeps; it answers `WouldBlock` while something is pending.
//! [`ConnectivitySupervisor::ensure_connected`] is the blocking form used by
//! the control loop: the device has nothing else to do while offline, so it
//! sleeps until the next scheduled attempt and retries forever.

use core::convert::Infallible;
use core::fmt::Write;

use embedded_hal::delay::DelayNs;
use heapless::String;

use crate::config::{NodeConfig, CLIENT_ID_PREFIX, HELLO_PAYLOAD};
use crate::errors::ConnectFailure;
use crate::time::{Cadence, TimeSource, Timestamp};
use crate::traits::{BusSession, NetworkLink};

/// Capacity of a bus client identity
pub const CLIENT_ID_CAPACITY: usize = 32;

/// Bus client identity
pub type ClientId = String<CLIENT_ID_CAPACITY>;

/// Identity derived from a stable hardware identifier (e.g. a fused MAC)
///
/// Only the low 32 bits are used, so the identity is stable across reboots
/// of the same device but not guaranteed unique across device classes.
pub fn client_id_from_hardware(hardware_id: u64) -> ClientId {
    let mut id = ClientId::new();
    // prefix + 8 hex digits always fits
    let _ = write!(id, "{}{:08x}", CLIENT_ID_PREFIX, hardware_id as u32);
    id
}

/// Connectivity of the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    /// No network association
    Disconnected,
    /// Network associated, no bus session
    NetworkUp,
    /// Network associated and bus session established
    BusConnected,
}

/// Connection statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Association cycles started
    pub network_attempts: u32,
    /// Progress markers emitted while associating
    pub progress_marks: u32,
    /// Bus session attempts
    pub bus_attempts: u32,
    /// Sessions established after the first one
    pub reconnections: u32,
    /// Reason of the most recent failed session attempt
    pub last_failure: Option<ConnectFailure>,
}

/// Network and bus session state machine
#[derive(Debug, Clone)]
pub struct ConnectivitySupervisor {
    state: ConnectivityState,
    client_id: ClientId,
    hello_topic: &'static str,
    associating: bool,
    progress: Cadence,
    backoff_ms: u64,
    retry: Option<Cadence>,
    sessions: u32,
    stats: ConnectionStats,
}

impl ConnectivitySupervisor {
    /// Supervisor for `client_id`, timings and topics from `config`
    pub fn new(client_id: ClientId, config: &NodeConfig) -> Self {
        Self {
            state: ConnectivityState::Disconnected,
            client_id,
            hello_topic: config.topics.events,
            associating: false,
            progress: Cadence::new(config.network_progress_interval_ms),
            backoff_ms: config.bus_retry_backoff_ms,
            retry: None,
            sessions: 0,
            stats: ConnectionStats::default(),
        }
    }

    /// Current state
    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    /// Bus identity in use
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Counters since boot
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Whether outbound reporting may proceed
    pub fn is_connected(&self) -> bool {
        self.state == ConnectivityState::BusConnected
    }

    /// Whether the network layer is ready (bus state irrelevant)
    pub fn network_ready(&self) -> bool {
        self.state != ConnectivityState::Disconnected
    }

    /// Advance one bounded step
    ///
    /// Returns `Ok(())` once network and bus are both up; `WouldBlock`
    /// while association or a session attempt is pending.
    ///
    /// The clock is read again after a failed handshake: the backoff counts
    /// from the failure, not from the start of the attempt.
    pub fn poll<N, B, T>(&mut self, clock: &T, network: &mut N, bus: &mut B) -> nb::Result<(), Infallible>
    where
        N: NetworkLink + ?Sized,
        B: BusSession + ?Sized,
        T: TimeSource + ?Sized,
    {
        let now = clock.now();
        if !network.is_up() {
            self.on_network_down(now, network, bus);
            return Err(nb::Error::WouldBlock);
        }

        if self.state == ConnectivityState::Disconnected {
            match network.local_address() {
                Some(addr) => log_info!("network: associated, address {}", addr),
                None => log_info!("network: associated"),
            }
            self.associating = false;
            self.state = ConnectivityState::NetworkUp;
            self.retry = None;
        }

        if self.state == ConnectivityState::BusConnected {
            if bus.is_connected() {
                return Ok(());
            }
            log_warn!("bus: session lost");
            self.state = ConnectivityState::NetworkUp;
            self.retry = None;
        }

        if let Some(retry) = self.retry.as_mut() {
            if !retry.fire(now) {
                return Err(nb::Error::WouldBlock);
            }
        }

        self.attempt_session(clock, bus)
    }

    /// Block until network and bus are both up
    pub fn ensure_connected<N, B, T, D>(&mut self, network: &mut N, bus: &mut B, clock: &T, delay: &mut D)
    where
        N: NetworkLink + ?Sized,
        B: BusSession + ?Sized,
        T: TimeSource + ?Sized,
        D: DelayNs + ?Sized,
    {
        loop {
            match self.poll(clock, network, bus) {
                Ok(()) => return,
                Err(nb::Error::WouldBlock) => {
                    let wait = self.retry_in(clock.now()).max(1);
                    delay.delay_ms(u32::try_from(wait).unwrap_or(u32::MAX));
                }
                Err(nb::Error::Other(never)) => match never {},
            }
        }
    }

    /// Milliseconds until the next scheduled action
    pub fn retry_in(&self, now: Timestamp) -> u64 {
        match self.state {
            ConnectivityState::Disconnected => self.progress.remaining(now),
            _ => self.retry.map_or(0, |retry| retry.remaining(now)),
        }
    }

    fn on_network_down<N, B>(&mut self, now: Timestamp, network: &mut N, bus: &mut B)
    where
        N: NetworkLink + ?Sized,
        B: BusSession + ?Sized,
    {
        if self.state != ConnectivityState::Disconnected {
            log_warn!("network: link lost, re-associating");
            bus.disconnect();
            self.state = ConnectivityState::Disconnected;
            self.associating = false;
        }

        if !self.associating {
            self.associating = true;
            self.stats.network_attempts += 1;
            log_info!("network: associating (cycle #{})", self.stats.network_attempts);
            network.begin();
            self.progress.reset(now);
        } else if self.progress.fire(now) {
            self.stats.progress_marks += 1;
            log_info!("network: still associating ({} checks)", self.stats.progress_marks);
        }
    }

    fn attempt_session<B, T>(&mut self, clock: &T, bus: &mut B) -> nb::Result<(), Infallible>
    where
        B: BusSession + ?Sized,
        T: TimeSource + ?Sized,
    {
        self.stats.bus_attempts += 1;
        log_info!(
            "bus: connecting as {} (attempt #{})",
            self.client_id.as_str(),
            self.stats.bus_attempts
        );

        match bus.connect(&self.client_id) {
            Ok(()) => {
                self.state = ConnectivityState::BusConnected;
                self.retry = None;
                self.sessions += 1;
                if self.sessions > 1 {
                    self.stats.reconnections += 1;
                }
                log_info!("bus: connected, client_id={}", self.client_id.as_str());

                match bus.publish(self.hello_topic, HELLO_PAYLOAD, false) {
                    Ok(()) => log_info!("bus: hello -> {} OK", self.hello_topic),
                    Err(err) => log_warn!("bus: hello -> {} FAILED: {}", self.hello_topic, err),
                }
                Ok(())
            }
            Err(reason) => {
                self.stats.last_failure = Some(reason);
                log_warn!(
                    "bus: connect failed, state={} ({}), retrying in {} ms",
                    reason.label(),
                    reason,
                    self.backoff_ms
                );
                // connect may block for the whole handshake timeout
                let failed_at = clock.now();
                self.retry = Some(Cadence::starting_at(self.backoff_ms, failed_at));
                Err(nb::Error::WouldBlock)
            }
        }
    }
}
