//! Build-Time Configuration for the Node
//!
//! All tunables are fixed when the firmware is built. They are grouped the
//! same way as they are consumed:
//!
//! - **Cadences**: tick quantum, light sampling and config polling periods
//! - **Connectivity**: association progress interval, bus backoff, topics
//! - **Light**: hysteresis thresholds in lux
//! - **Alert**: buzzer drive kind and beep shape
//!
//! [`NodeConfig`] collects the constants into one value so the control loop
//! and tests can run with non-default numbers without touching globals.

use crate::errors::ConfigError;

// ===== CADENCES =====

/// Scheduling quantum of the control loop (milliseconds).
///
/// Also the de facto presence debounce interval: chatter faster than one
/// tick is never observed.
pub const TICK_INTERVAL_MS: u32 = 50;

/// Light sensor sampling period (milliseconds).
pub const LIGHT_SAMPLE_INTERVAL_MS: u64 = 2000;

/// Remote sensing-enabled poll period (milliseconds).
pub const CONFIG_POLL_INTERVAL_MS: u64 = 3000;

// ===== CONNECTIVITY =====

/// Interval between association progress markers while the network is down.
pub const NETWORK_PROGRESS_INTERVAL_MS: u64 = 500;

/// Fixed wait after a failed bus session attempt.
pub const BUS_RETRY_BACKOFF_MS: u64 = 2000;

/// Default broker host.
pub const MQTT_BROKER_HOST: &str = "test.mosquitto.org";

/// Default broker port.
pub const MQTT_BROKER_PORT: u16 = 1883;

/// Primary topic: hello and motion notifications (not retained).
pub const TOPIC_EVENTS: &str = "edgewatch/node/events";

/// Last valid illuminance reading (retained).
pub const TOPIC_LIGHT_LEVEL: &str = "edgewatch/node/light/lux";

/// Light on/off flag (retained).
pub const TOPIC_LIGHT_STATE: &str = "edgewatch/node/light/state";

/// Payload sent once per established bus session.
pub const HELLO_PAYLOAD: &str = "HELLO (boot/reconnect)";

/// Prefix of the bus client identity.
pub const CLIENT_ID_PREFIX: &str = "edgewatch-";

/// Default collector base address.
pub const COLLECTOR_BASE_URL: &str = "http://127.0.0.1:5000";

/// Sensing-enabled value used when the boot fetch fails.
pub const DEFAULT_SENSING_ENABLED: bool = true;

// ===== LIGHT =====

/// Reading at or above which the light is considered on (lux).
pub const LIGHT_ON_THRESHOLD_LUX: f32 = 60.0;

/// Reading at or below which the light is considered off (lux).
pub const LIGHT_OFF_THRESHOLD_LUX: f32 = 40.0;

// ===== ALERT =====

/// Which buzzer hardware is fitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuzzerKind {
    /// Passive element driven by a PWM tone at reduced duty
    Passive,
    /// Active element, only switchable on/off
    Active,
}

/// Fitted buzzer.
pub const BUZZER_KIND: BuzzerKind = BuzzerKind::Passive;

/// Motion beep frequency (Hz).
pub const BEEP_FREQUENCY_HZ: u32 = 1500;

/// Motion beep duration (milliseconds).
pub const BEEP_DURATION_MS: u32 = 120;

/// Passive buzzer duty as a fraction of full scale (30/1023, about 3%).
pub const BUZZER_SOFT_DUTY_NUM: u16 = 30;

/// Denominator for [`BUZZER_SOFT_DUTY_NUM`].
pub const BUZZER_SOFT_DUTY_DEN: u16 = 1023;

/// Active buzzer on-time inside one pulse period (milliseconds).
pub const PULSE_ON_MS: u32 = 2;

/// Active buzzer off-time inside one pulse period (milliseconds).
pub const PULSE_OFF_MS: u32 = 8;

/// Topic names used by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topics {
    /// Hello and motion messages
    pub events: &'static str,
    /// Retained illuminance telemetry
    pub light_level: &'static str,
    /// Retained light on/off flag
    pub light_state: &'static str,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            events: TOPIC_EVENTS,
            light_level: TOPIC_LIGHT_LEVEL,
            light_state: TOPIC_LIGHT_STATE,
        }
    }
}

/// Complete node configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeConfig {
    /// Scheduling quantum (ms)
    pub tick_interval_ms: u32,
    /// Light sampling period (ms)
    pub light_sample_interval_ms: u64,
    /// Remote config poll period (ms)
    pub config_poll_interval_ms: u64,
    /// Association progress interval (ms)
    pub network_progress_interval_ms: u64,
    /// Bus reconnect backoff (ms)
    pub bus_retry_backoff_ms: u64,
    /// Light on threshold (lux)
    pub light_on_lux: f32,
    /// Light off threshold (lux)
    pub light_off_lux: f32,
    /// Motion beep frequency (Hz)
    pub beep_frequency_hz: u32,
    /// Motion beep duration (ms)
    pub beep_duration_ms: u32,
    /// Sensing-enabled fallback at boot
    pub default_sensing_enabled: bool,
    /// Bus topics
    pub topics: Topics,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: TICK_INTERVAL_MS,
            light_sample_interval_ms: LIGHT_SAMPLE_INTERVAL_MS,
            config_poll_interval_ms: CONFIG_POLL_INTERVAL_MS,
            network_progress_interval_ms: NETWORK_PROGRESS_INTERVAL_MS,
            bus_retry_backoff_ms: BUS_RETRY_BACKOFF_MS,
            light_on_lux: LIGHT_ON_THRESHOLD_LUX,
            light_off_lux: LIGHT_OFF_THRESHOLD_LUX,
            beep_frequency_hz: BEEP_FREQUENCY_HZ,
            beep_duration_ms: BEEP_DURATION_MS,
            default_sensing_enabled: DEFAULT_SENSING_ENABLED,
            topics: Topics::default(),
        }
    }
}

impl NodeConfig {
    /// Override the hysteresis thresholds
    pub fn with_light_thresholds(mut self, on_lux: f32, off_lux: f32) -> Self {
        self.light_on_lux = on_lux;
        self.light_off_lux = off_lux;
        self
    }

    /// Override the bus reconnect backoff
    pub fn with_bus_backoff_ms(mut self, ms: u64) -> Self {
        self.bus_retry_backoff_ms = ms;
        self
    }

    /// Override the remote config poll period
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config_poll_interval_ms = ms;
        self
    }

    /// Override the light sampling period
    pub fn with_light_interval_ms(mut self, ms: u64) -> Self {
        self.light_sample_interval_ms = ms;
        self
    }

    /// Reject inverted thresholds and zero intervals
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.light_off_lux < self.light_on_lux) {
            return Err(ConfigError::InvalidHysteresis {
                on: self.light_on_lux,
                off: self.light_off_lux,
            });
        }
        let intervals = [
            ("tick_interval_ms", self.tick_interval_ms as u64),
            ("light_sample_interval_ms", self.light_sample_interval_ms),
            ("config_poll_interval_ms", self.config_poll_interval_ms),
            ("network_progress_interval_ms", self.network_progress_interval_ms),
            ("bus_retry_backoff_ms", self.bus_retry_backoff_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::ZeroInterval { name });
            }
        }
        Ok(())
    }
}
