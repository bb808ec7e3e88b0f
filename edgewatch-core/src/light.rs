//! Light-Level Classifier
//!
//! Turns a noisy illuminance reading into a stable on/off state with two
//! thresholds:
//!
//! ```text
//!   lux
//!    ▲
//!    │ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ON threshold   (Off ──▶ On at or above)
//!    │        dead band: no transition in either direction
//!    │ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ OFF threshold  (On ──▶ Off at or below)
//!    └──────────────────────────────────────▶ t
//! ```
//!
//! The classifier knows nothing about timing; the control loop decides when
//! to sample. Invalid readings (negative or NaN, which is how light sensor
//! drivers report a failed read) never touch the state.

use crate::errors::ConfigError;

/// Binary light state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightState {
    /// Below the on threshold since the last off transition
    Off,
    /// Above the off threshold since the last on transition
    On,
}

impl LightState {
    /// Wire label, `"ON"` or `"OFF"`
    pub const fn label(&self) -> &'static str {
        match self {
            LightState::Off => "OFF",
            LightState::On => "ON",
        }
    }

    /// True for [`LightState::On`]
    pub const fn is_on(&self) -> bool {
        matches!(self, LightState::On)
    }
}

/// A change of light state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightTransition {
    /// State before the reading
    pub from: LightState,
    /// State after the reading
    pub to: LightState,
    /// Reading that crossed the threshold
    pub lux: f32,
}

/// Dual-threshold light classifier
#[derive(Debug, Clone)]
pub struct LightClassifier {
    on_lux: f32,
    off_lux: f32,
    state: LightState,
    last_lux: Option<f32>,
}

impl LightClassifier {
    /// Classifier starting in `Off`; requires `off_lux < on_lux`
    pub fn new(on_lux: f32, off_lux: f32) -> Result<Self, ConfigError> {
        if !(off_lux < on_lux) {
            return Err(ConfigError::InvalidHysteresis { on: on_lux, off: off_lux });
        }
        Ok(Self {
            on_lux,
            off_lux,
            state: LightState::Off,
            last_lux: None,
        })
    }

    /// Whether a raw reading is usable
    pub fn accepts(raw_lux: f32) -> bool {
        !raw_lux.is_nan() && raw_lux >= 0.0
    }

    /// Feed one reading; returns the transition it caused, if any
    pub fn sample(&mut self, raw_lux: f32) -> Option<LightTransition> {
        if !Self::accepts(raw_lux) {
            log_debug!("light: discarding invalid reading {}", raw_lux);
            return None;
        }
        self.last_lux = Some(raw_lux);

        let next = match self.state {
            LightState::Off if raw_lux >= self.on_lux => LightState::On,
            LightState::On if raw_lux <= self.off_lux => LightState::Off,
            _ => return None,
        };

        let transition = LightTransition { from: self.state, to: next, lux: raw_lux };
        self.state = next;
        Some(transition)
    }

    /// Current state
    pub fn state(&self) -> LightState {
        self.state
    }

    /// Last valid reading, if any has been seen
    pub fn last_lux(&self) -> Option<f32> {
        self.last_lux
    }

    /// Thresholds as `(on, off)`
    pub fn thresholds(&self) -> (f32, f32) {
        (self.on_lux, self.off_lux)
    }
}
