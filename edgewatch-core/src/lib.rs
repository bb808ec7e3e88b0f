//! Control loop core for EdgeWatch
//!
//! Presence and ambient-light sensing for a single edge node, with
//! resilient reporting over a message bus and an HTTP collector.
//!
//! Key constraints:
//! - Single execution context, no threads, no async runtime
//! - No heap allocation; identities and payloads are fixed-capacity
//! - Builds without `std` for MCU targets (`--no-default-features`)
//!
//! All hardware and transports sit behind the seams in [`traits`]; a
//! [`Platform`] picks one concrete type per seam.
//!
//! ```no_run
//! use edgewatch_core::{Board, ControlLoop, NodeConfig, Platform};
//!
//! fn start<P: Platform>(board: Board<P>, hardware_id: u64) {
//!     let node = ControlLoop::new(board, NodeConfig::default(), hardware_id)
//!         .expect("default config is valid");
//!     node.run()
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod actuator;
pub mod config;
pub mod connectivity;
pub mod control;
pub mod errors;
pub mod events;
pub mod light;
pub mod poller;
pub mod presence;
pub mod reporter;
pub mod time;
pub mod traits;

// Public API
pub use actuator::{Actuator, PulsedBuzzer, ToneBuzzer};
pub use config::{BuzzerKind, NodeConfig, Topics};
pub use connectivity::{client_id_from_hardware, ClientId, ConnectivityState, ConnectivitySupervisor};
pub use control::{ControlLoop, LoopState, TickReport};
pub use errors::{ConfigError, ConnectFailure, FetchError, PublishError, ReportError};
pub use events::{Event, EventKind, EventRecord};
pub use light::{LightClassifier, LightState, LightTransition};
pub use poller::RemoteConfigPoller;
pub use presence::{Edge, PresenceDetector, PresenceState};
pub use reporter::{Delivery, EventReporter};
pub use time::{Cadence, TimeSource, Timestamp};
pub use traits::{
    Board,
    BusSession,
    ConfigSource,
    EventSink,
    LightSensor,
    NetworkLink,
    Platform,
    ToneOutput,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
