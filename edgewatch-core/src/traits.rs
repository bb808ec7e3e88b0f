//! Hardware and Transport Seams
//!
//! The control loop never touches a radio, a socket or a register directly.
//! Everything outside the core is reached through the traits in this module,
//! which keeps the loop testable on the host with scripted fakes and lets
//! the same code run on an MCU with real drivers.
//!
//! ## Seams
//!
//! | Trait          | Boundary                                   |
//! |----------------|--------------------------------------------|
//! | `NetworkLink`  | network association (Wi-Fi, Ethernet)      |
//! | `BusSession`   | publish/subscribe session (MQTT)           |
//! | `EventSink`    | collector `POST /api/events`               |
//! | `ConfigSource` | collector `GET /api/sensor-state`          |
//! | `LightSensor`  | illuminance driver                         |
//! | `ToneOutput`   | PWM channel with adjustable frequency      |
//!
//! Digital inputs/outputs, PWM duty and blocking delays use the
//! `embedded-hal` 1.0 traits directly.
//!
//! [`Platform`] ties one concrete type to each seam so the control loop
//! takes a single type parameter.

use core::net::IpAddr;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;

use crate::actuator::Actuator;
use crate::errors::{ConnectFailure, FetchError, PublishError, ReportError};
use crate::events::EventRecord;
use crate::time::TimeSource;

/// Network association (layer 2/3)
pub trait NetworkLink {
    /// Start (or restart) association; must not block
    fn begin(&mut self);

    /// Whether the node currently has a usable network
    fn is_up(&mut self) -> bool;

    /// Address assigned to the node, for diagnostics
    fn local_address(&self) -> Option<IpAddr> {
        None
    }
}

/// Publish/subscribe session with the message bus
pub trait BusSession {
    /// Whether a session is currently established
    fn is_connected(&self) -> bool;

    /// Attempt to establish a session under `client_id`
    ///
    /// May block for the duration of the handshake. On failure the reason
    /// is reported from the closed [`ConnectFailure`] taxonomy.
    fn connect(&mut self, client_id: &str) -> Result<(), ConnectFailure>;

    /// Publish a plain-text payload
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError>;

    /// Bounded, non-blocking inbound and keepalive processing
    fn service(&mut self);

    /// Drop the session, if any
    fn disconnect(&mut self);
}

/// HTTP event notification
pub trait EventSink {
    /// Send one event; any 2xx response is success
    fn post_event(&mut self, record: &EventRecord<'_>) -> Result<(), ReportError>;
}

/// Remote source of the sensing-enabled flag
pub trait ConfigSource {
    /// Fetch the current flag
    fn fetch_enabled(&mut self) -> Result<bool, FetchError>;
}

/// Illuminance driver
pub trait LightSensor {
    /// Read illuminance in lux; NaN or a negative value signals a failed read
    fn read_lux(&mut self) -> f32;
}

/// PWM channel whose frequency can be changed at runtime
pub trait ToneOutput: SetDutyCycle {
    /// Set the output frequency in Hz
    fn set_frequency(&mut self, hz: u32) -> Result<(), Self::Error>;
}

/// One concrete type per seam
pub trait Platform {
    /// Presence sensor digital input
    type Presence: InputPin;
    /// Illuminance sensor
    type Light: LightSensor;
    /// Audible alert
    type Alert: Actuator;
    /// Visual light-state indicator
    type Indicator: OutputPin;
    /// Network association
    type Network: NetworkLink;
    /// Message bus session
    type Bus: BusSession;
    /// Remote collector (events and configuration)
    type Collector: EventSink + ConfigSource;
    /// Monotonic clock
    type Clock: TimeSource;
    /// Blocking delay
    type Delay: DelayNs;
}

/// Concrete devices and transports for a [`Platform`]
pub struct Board<P: Platform> {
    /// Presence sensor digital input
    pub presence: P::Presence,
    /// Illuminance sensor
    pub light: P::Light,
    /// Audible alert
    pub alert: P::Alert,
    /// Visual light-state indicator
    pub indicator: P::Indicator,
    /// Network association
    pub network: P::Network,
    /// Message bus session
    pub bus: P::Bus,
    /// Remote collector
    pub collector: P::Collector,
    /// Monotonic clock
    pub clock: P::Clock,
    /// Blocking delay
    pub delay: P::Delay,
}
