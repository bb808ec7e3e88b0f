//! Log-backed outputs and std timing
//!
//! A host has no buzzer or LED, so the outputs log what a real driver would
//! do. Timing is real: `StdDelay` sleeps the thread, which keeps the beep
//! duration and tick cadence observable.

use std::convert::Infallible;
use std::thread;
use std::time::Duration;

use edgewatch_core::config::{BuzzerKind, BUZZER_KIND};
use edgewatch_core::{Actuator, PulsedBuzzer, ToneBuzzer, ToneOutput};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};
use log::{debug, info};

/// Full-scale duty of the simulated PWM channel (10 bit)
pub const LOG_PWM_MAX_DUTY: u16 = 1023;

/// Blocking delay on the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// PWM channel that logs duty and frequency changes
#[derive(Debug)]
pub struct LogTone {
    name: &'static str,
    duty: u16,
    frequency_hz: u32,
}

impl LogTone {
    /// Silent channel
    pub fn new(name: &'static str) -> Self {
        Self { name, duty: 0, frequency_hz: 0 }
    }

    /// Last duty written
    #[cfg(test)]
    pub fn duty(&self) -> u16 {
        self.duty
    }
}

impl pwm::ErrorType for LogTone {
    type Error = Infallible;
}

impl SetDutyCycle for LogTone {
    fn max_duty_cycle(&self) -> u16 {
        LOG_PWM_MAX_DUTY
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        if duty != self.duty {
            if duty == 0 {
                debug!("{}: off", self.name);
            } else {
                info!("{}: {} Hz at duty {}/{}", self.name, self.frequency_hz, duty, LOG_PWM_MAX_DUTY);
            }
        }
        self.duty = duty;
        Ok(())
    }
}

impl ToneOutput for LogTone {
    fn set_frequency(&mut self, hz: u32) -> Result<(), Self::Error> {
        self.frequency_hz = hz;
        Ok(())
    }
}

/// Digital output that logs level changes
#[derive(Debug)]
pub struct LogPin {
    name: &'static str,
    high: bool,
    quiet: bool,
}

impl LogPin {
    /// Low output; `quiet` pins log at debug level only
    pub fn new(name: &'static str, quiet: bool) -> Self {
        Self { name, high: false, quiet }
    }

    /// Current level
    #[cfg(test)]
    pub fn is_set_high(&self) -> bool {
        self.high
    }

    fn set(&mut self, high: bool) {
        if high != self.high {
            let level = if high { "HIGH" } else { "LOW" };
            if self.quiet {
                debug!("{}: {}", self.name, level);
            } else {
                info!("{}: {}", self.name, level);
            }
        }
        self.high = high;
    }
}

impl digital::ErrorType for LogPin {
    type Error = Infallible;
}

impl OutputPin for LogPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}

/// Buzzer variant chosen at build time
pub enum Buzzer {
    /// Passive element on a PWM channel
    Tone(ToneBuzzer<LogTone, StdDelay>),
    /// Active element on a plain pin
    Pulsed(PulsedBuzzer<LogPin, StdDelay>),
}

impl Buzzer {
    /// Buzzer of `kind`
    pub fn new(kind: BuzzerKind) -> Self {
        match kind {
            BuzzerKind::Passive => Buzzer::Tone(ToneBuzzer::new(LogTone::new("buzzer"), StdDelay)),
            BuzzerKind::Active => Buzzer::Pulsed(PulsedBuzzer::new(LogPin::new("buzzer", true), StdDelay)),
        }
    }
}

impl Default for Buzzer {
    fn default() -> Self {
        Self::new(BUZZER_KIND)
    }
}

impl Actuator for Buzzer {
    fn pulse(&mut self, frequency_hz: u32, duration_ms: u32) {
        match self {
            Buzzer::Tone(b) => b.pulse(frequency_hz, duration_ms),
            Buzzer::Pulsed(b) => b.pulse(frequency_hz, duration_ms),
        }
    }

    fn silence(&mut self) {
        match self {
            Buzzer::Tone(b) => b.silence(),
            Buzzer::Pulsed(b) => b.silence(),
        }
    }

    fn is_active(&self) -> bool {
        match self {
            Buzzer::Tone(b) => b.is_active(),
            Buzzer::Pulsed(b) => b.is_active(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_buzzer_ends_silent() {
        let mut buzzer = Buzzer::new(BuzzerKind::Passive);
        buzzer.pulse(1500, 1);
        assert!(!buzzer.is_active());

        let Buzzer::Tone(tone) = buzzer else {
            panic!("expected tone buzzer");
        };
        let (channel, _) = tone.into_inner();
        assert_eq!(channel.duty(), 0);
    }

    #[test]
    fn test_pulsed_buzzer_ends_low() {
        let mut buzzer = Buzzer::new(BuzzerKind::Active);
        buzzer.pulse(1500, 10);
        assert!(!buzzer.is_active());

        let Buzzer::Pulsed(pulsed) = buzzer else {
            panic!("expected pulsed buzzer");
        };
        let (pin, _) = pulsed.into_inner();
        assert!(!pin.is_set_high());
    }

    #[test]
    fn test_indicator_pin_tracks_level() {
        let mut pin = LogPin::new("light", false);
        pin.set_high().unwrap();
        assert!(pin.is_set_high());
        pin.set_low().unwrap();
        assert!(!pin.is_set_high());
    }
}
