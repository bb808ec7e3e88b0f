//! Alert Actuator
//!
//! Drives the buzzer for a short, quiet beep and guarantees it is silent
//! again before control returns to the loop. Two drive styles exist because
//! two kinds of buzzer get fitted:
//!
//! - **Passive** elements need a tone. [`ToneBuzzer`] sets the frequency and
//!   a low PWM duty (about 3% of full scale) for reduced volume.
//! - **Active** elements only switch on and off. [`PulsedBuzzer`] emulates
//!   low volume with a 2 ms on / 8 ms off pulse train.
//!
//! Which one is used is decided once, when the board is assembled, from
//! `config::BUZZER_KIND`.
//!
//! ## Exit-path guarantee
//!
//! Every `pulse` ends in `silence`, including when a pin operation fails
//! midway. `silence` itself is idempotent and safe from any state.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::{BUZZER_SOFT_DUTY_DEN, BUZZER_SOFT_DUTY_NUM, PULSE_OFF_MS, PULSE_ON_MS};
use crate::traits::ToneOutput;

/// Audible/visual alert output
pub trait Actuator {
    /// Sound for `duration_ms` at reduced intensity, then silence
    fn pulse(&mut self, frequency_hz: u32, duration_ms: u32);

    /// Force the output inert; safe to call repeatedly
    fn silence(&mut self);

    /// Whether the output is currently driven
    fn is_active(&self) -> bool;
}

/// Duty-modulated drive for passive buzzers
pub struct ToneBuzzer<T, D> {
    output: T,
    delay: D,
    active: bool,
}

impl<T: ToneOutput, D: DelayNs> ToneBuzzer<T, D> {
    /// Take ownership of the channel and leave it silent
    pub fn new(output: T, delay: D) -> Self {
        let mut buzzer = Self { output, delay, active: true };
        buzzer.silence();
        buzzer
    }

    /// Duty used for a soft beep, never zero on a non-zero scale
    pub fn soft_duty(&self) -> u16 {
        let max = self.output.max_duty_cycle() as u32;
        let duty = max * BUZZER_SOFT_DUTY_NUM as u32 / BUZZER_SOFT_DUTY_DEN as u32;
        if duty == 0 && max > 0 {
            1
        } else {
            duty as u16
        }
    }

    /// Release the channel
    pub fn into_inner(self) -> (T, D) {
        (self.output, self.delay)
    }
}

impl<T: ToneOutput, D: DelayNs> Actuator for ToneBuzzer<T, D> {
    fn pulse(&mut self, frequency_hz: u32, duration_ms: u32) {
        if let Err(err) = self.output.set_frequency(frequency_hz) {
            log_warn!("buzzer: set frequency {} Hz failed: {:?}", frequency_hz, err);
            self.silence();
            return;
        }

        let duty = self.soft_duty();
        self.active = true;
        match self.output.set_duty_cycle(duty) {
            Ok(()) => self.delay.delay_ms(duration_ms),
            Err(err) => log_warn!("buzzer: set duty failed: {:?}", err),
        }
        self.silence();
    }

    fn silence(&mut self) {
        if let Err(err) = self.output.set_duty_cycle_fully_off() {
            log_warn!("buzzer: silence failed: {:?}", err);
        }
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// On/off drive for active buzzers
///
/// The element has a fixed pitch, so the requested frequency is ignored.
pub struct PulsedBuzzer<O, D> {
    pin: O,
    delay: D,
    active: bool,
}

impl<O: OutputPin, D: DelayNs> PulsedBuzzer<O, D> {
    /// Take ownership of the pin and drive it low
    pub fn new(pin: O, delay: D) -> Self {
        let mut buzzer = Self { pin, delay, active: true };
        buzzer.silence();
        buzzer
    }

    /// Number of on/off periods needed to cover `duration_ms`
    pub fn periods_for(duration_ms: u32) -> u32 {
        let period = PULSE_ON_MS + PULSE_OFF_MS;
        duration_ms.div_ceil(period)
    }

    /// Release the pin
    pub fn into_inner(self) -> (O, D) {
        (self.pin, self.delay)
    }
}

impl<O: OutputPin, D: DelayNs> Actuator for PulsedBuzzer<O, D> {
    fn pulse(&mut self, _frequency_hz: u32, duration_ms: u32) {
        for _ in 0..Self::periods_for(duration_ms) {
            self.active = true;
            if let Err(err) = self.pin.set_high() {
                log_warn!("buzzer: drive high failed: {:?}", err);
                break;
            }
            self.delay.delay_ms(PULSE_ON_MS);
            if let Err(err) = self.pin.set_low() {
                log_warn!("buzzer: drive low failed: {:?}", err);
                break;
            }
            self.delay.delay_ms(PULSE_OFF_MS);
        }
        self.silence();
    }

    fn silence(&mut self) {
        if let Err(err) = self.pin.set_low() {
            log_warn!("buzzer: silence failed: {:?}", err);
        }
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
