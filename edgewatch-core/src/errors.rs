//! Error Types for Connectivity, Sensing and Reporting Failures
//!
//! ## Design Philosophy
//!
//! Nothing in the control loop is fatal. Every error here is a value the loop
//! inspects, logs and drops:
//!
//! 1. **Small Size**: variants carry at most a status code or a `&'static str`,
//!    so errors can be returned from hot paths on a 32KB-RAM target.
//!
//! 2. **No Heap Allocation**: no `String` payloads. Transports that have a rich
//!    error (an `io::Error`, a JSON parse error) log it and collapse it into
//!    one of these variants.
//!
//! 3. **Copy Semantics**: errors are `Copy` and cheap to store as the
//!    "last failure" in statistics.
//!
//! ## Error Categories
//!
//! ### Connectivity (`ConnectFailure`)
//! Closed taxonomy of reasons a bus session could not be established. Always
//! retried with a fixed backoff.
//!
//! ### Remote configuration (`FetchError`)
//! Reasons a sensing-enabled poll produced no value. The cached flag stays
//! frozen until the next successful poll.
//!
//! ### Reporting (`PublishError`, `ReportError`)
//! Bus and HTTP dispatch failures. Logged, counted, never retried.
//!
//! ### Configuration (`ConfigError`)
//! Rejected build-time parameters (e.g. an inverted hysteresis band).

use thiserror_no_std::Error;

/// Why a bus session could not be established
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    /// Broker does not speak the requested protocol revision
    #[error("protocol version rejected by broker")]
    ProtocolMismatch,

    /// Broker refused the client identity
    #[error("client identity rejected")]
    IdentityRejected,

    /// Broker reachable but not accepting sessions
    #[error("broker unavailable")]
    BrokerUnavailable,

    /// Username/password refused
    #[error("authentication failed")]
    BadCredentials,

    /// Authenticated but not allowed to connect
    #[error("not authorized")]
    NotAuthorized,

    /// TCP/DNS/timeout failure below the protocol layer
    #[error("transport failure")]
    Transport,

    /// Anything the taxonomy does not cover
    #[error("unknown failure")]
    Unknown,
}

impl ConnectFailure {
    /// Stable upper-case label used in log lines
    pub const fn label(&self) -> &'static str {
        match self {
            ConnectFailure::ProtocolMismatch => "CONNECT_BAD_PROTOCOL",
            ConnectFailure::IdentityRejected => "CONNECT_BAD_CLIENT_ID",
            ConnectFailure::BrokerUnavailable => "CONNECT_UNAVAILABLE",
            ConnectFailure::BadCredentials => "CONNECT_BAD_CREDENTIALS",
            ConnectFailure::NotAuthorized => "CONNECT_UNAUTHORIZED",
            ConnectFailure::Transport => "CONNECTION_FAILED",
            ConnectFailure::Unknown => "UNKNOWN",
        }
    }
}

/// Why a remote configuration fetch produced no value
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchError {
    /// Network layer not ready; the request was never attempted
    #[error("network unavailable")]
    NetworkUnavailable,

    /// Server answered with something other than 200
    #[error("unexpected status {status}")]
    Status {
        /// HTTP status code returned by the collector
        status: u16,
    },

    /// Body was not valid JSON
    #[error("malformed payload")]
    Malformed,

    /// Body was JSON but lacked a boolean `enabled`
    #[error("missing field `{field}`")]
    MissingField {
        /// Name of the absent field
        field: &'static str,
    },

    /// Connection, DNS or timeout failure
    #[error("transport failure")]
    Transport,
}

/// Bus publish failure
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// No session is established
    #[error("bus session not connected")]
    NotConnected,

    /// Outgoing request queue is full
    #[error("outgoing queue full")]
    QueueFull,

    /// Payload does not fit the publish buffer
    #[error("payload too large")]
    PayloadTooLarge,
}

/// HTTP event report failure
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportError {
    /// Collector answered with a non-2xx status
    #[error("collector returned status {status}")]
    Status {
        /// HTTP status code returned by the collector
        status: u16,
    },

    /// Body could not be encoded
    #[error("serialization failed")]
    Serialization,

    /// Connection, DNS or timeout failure
    #[error("transport failure")]
    Transport,
}

/// Rejected configuration parameters
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// OFF threshold must be strictly below ON threshold
    #[error("hysteresis band inverted: off {off} >= on {on}")]
    InvalidHysteresis {
        /// Threshold that switches the light state on
        on: f32,
        /// Threshold that switches the light state off
        off: f32,
    },

    /// A cadence or tick interval of zero
    #[error("interval `{name}` must be non-zero")]
    ZeroInterval {
        /// Name of the offending interval
        name: &'static str,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConnectFailure {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.label())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FetchError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::NetworkUnavailable => defmt::write!(fmt, "network unavailable"),
            Self::Status { status } => defmt::write!(fmt, "status {}", status),
            Self::Malformed => defmt::write!(fmt, "malformed payload"),
            Self::MissingField { field } => defmt::write!(fmt, "missing field {}", field),
            Self::Transport => defmt::write!(fmt, "transport failure"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ReportError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Status { status } => defmt::write!(fmt, "status {}", status),
            Self::Serialization => defmt::write!(fmt, "serialization failed"),
            Self::Transport => defmt::write!(fmt, "transport failure"),
        }
    }
}
