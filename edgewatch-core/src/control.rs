//! Control Loop
//!
//! Top-level scheduler tying the components together. Two states:
//!
//! - **Booting**: silence the actuator, block until network and bus are up,
//!   seed the sensing-enabled flag from the collector.
//! - **Steady**: one iteration per tick, forever.
//!
//! ```text
//! tick ─▶ ensure connected (may block)
//!      ─▶ service bus session
//!      ─▶ [light cadence]  sample ─▶ classify ─▶ indicator ─▶ report
//!      ─▶ [poll cadence]   refresh sensing-enabled
//!      ─▶ [sensing on]     sample ─▶ edge ─▶ buzzer ─▶ report
//! sleep one tick interval
//! ```
//!
//! Light monitoring is never gated by the sensing flag. For every detected
//! transition, actuation happens before reporting. There is no shutdown
//! path: [`ControlLoop::run`] returns only at power loss.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::actuator::Actuator;
use crate::config::NodeConfig;
use crate::connectivity::{client_id_from_hardware, ConnectivitySupervisor};
use crate::errors::ConfigError;
use crate::events::Event;
use crate::light::{LightClassifier, LightTransition};
use crate::poller::RemoteConfigPoller;
use crate::presence::{Edge, PresenceDetector};
use crate::reporter::{Delivery, EventReporter};
use crate::time::{Cadence, TimeSource};
use crate::traits::{Board, BusSession, LightSensor, Platform};

/// Lifecycle of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Connectivity and configuration not yet established
    Booting,
    /// Running the per-tick body
    Steady,
}

/// What one tick did
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Valid illuminance reading taken this tick
    pub lux: Option<f32>,
    /// Light transition detected this tick
    pub light: Option<LightTransition>,
    /// Delivery of the light event
    pub light_delivery: Option<Delivery>,
    /// New sensing-enabled value, if a poll changed it
    pub sensing_change: Option<bool>,
    /// Presence edge detected this tick
    pub edge: Option<Edge>,
    /// Delivery of the motion event
    pub motion_delivery: Option<Delivery>,
}

/// The node's control loop
pub struct ControlLoop<P: Platform> {
    board: Board<P>,
    config: NodeConfig,
    state: LoopState,
    connectivity: ConnectivitySupervisor,
    light: LightClassifier,
    presence: PresenceDetector,
    poller: RemoteConfigPoller,
    reporter: EventReporter,
    light_cadence: Cadence,
    ticks: u64,
}

impl<P: Platform> ControlLoop<P> {
    /// Assemble the loop; `hardware_id` seeds the bus and HTTP identity
    pub fn new(board: Board<P>, config: NodeConfig, hardware_id: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let client_id = client_id_from_hardware(hardware_id);

        Ok(Self {
            board,
            state: LoopState::Booting,
            connectivity: ConnectivitySupervisor::new(client_id.clone(), &config),
            light: LightClassifier::new(config.light_on_lux, config.light_off_lux)?,
            presence: PresenceDetector::new(),
            poller: RemoteConfigPoller::new(config.default_sensing_enabled, config.config_poll_interval_ms),
            reporter: EventReporter::new(client_id, config.topics),
            light_cadence: Cadence::new(config.light_sample_interval_ms),
            ticks: 0,
            config,
        })
    }

    /// Booting → Steady
    pub fn boot(&mut self) {
        log_info!("boot: node {} starting", self.connectivity.client_id());
        self.board.alert.silence();
        if let Err(err) = self.board.indicator.set_low() {
            log_warn!("boot: indicator reset failed: {:?}", err);
        }

        self.connectivity.ensure_connected(
            &mut self.board.network,
            &mut self.board.bus,
            &self.board.clock,
            &mut self.board.delay,
        );

        let now = self.board.clock.now();
        self.poller.seed(
            now,
            self.connectivity.network_ready(),
            self.config.default_sensing_enabled,
            &mut self.board.collector,
        );

        self.state = LoopState::Steady;
        log_info!("boot: steady, sensing {}", if self.poller.sensing_enabled() { "on" } else { "off" });
    }

    /// One Steady iteration (boots first if needed)
    pub fn tick(&mut self) -> TickReport {
        if self.state == LoopState::Booting {
            self.boot();
        }

        let mut report = TickReport::default();

        self.connectivity.ensure_connected(
            &mut self.board.network,
            &mut self.board.bus,
            &self.board.clock,
            &mut self.board.delay,
        );
        self.board.bus.service();

        let now = self.board.clock.now();

        if self.light_cadence.fire(now) {
            self.step_light(&mut report);
        }

        report.sensing_change =
            self.poller
                .refresh(now, self.connectivity.network_ready(), &mut self.board.collector);

        if self.poller.sensing_enabled() {
            self.step_presence(&mut report);
        }

        self.ticks += 1;
        report
    }

    /// Boot, then tick forever at the configured interval
    pub fn run(mut self) -> ! {
        self.boot();
        loop {
            self.tick();
            self.board.delay.delay_ms(self.config.tick_interval_ms);
        }
    }

    fn step_light(&mut self, report: &mut TickReport) {
        let raw = self.board.light.read_lux();
        let transition = self.light.sample(raw);
        if !LightClassifier::accepts(raw) {
            return;
        }
        report.lux = Some(raw);

        if let Some(transition) = transition {
            log_info!(
                "light: {} -> {} at {:.1} lx",
                transition.from.label(),
                transition.to.label(),
                transition.lux
            );
            let driven = if transition.to.is_on() {
                self.board.indicator.set_high()
            } else {
                self.board.indicator.set_low()
            };
            if let Err(err) = driven {
                log_warn!("light: indicator update failed: {:?}", err);
            }

            let event = Event::light(transition.to);
            report.light_delivery =
                Some(self.reporter.report(&event, &mut self.board.bus, &mut self.board.collector));
            report.light = Some(transition);
        }

        // Failures are counted and logged by the reporter
        let _ = self.reporter.publish_lux(raw, &mut self.board.bus);
    }

    fn step_presence(&mut self, report: &mut TickReport) {
        let raw = match self.board.presence.is_high() {
            Ok(raw) => raw,
            Err(err) => {
                log_warn!("presence: read failed: {:?}", err);
                return;
            }
        };

        match self.presence.sample(raw) {
            Some(Edge::Rising) => {
                log_info!("presence: motion detected");
                self.board
                    .alert
                    .pulse(self.config.beep_frequency_hz, self.config.beep_duration_ms);
                report.motion_delivery = Some(self.reporter.report(
                    &Event::motion(),
                    &mut self.board.bus,
                    &mut self.board.collector,
                ));
                report.edge = Some(Edge::Rising);
            }
            Some(Edge::Falling) => {
                log_info!("presence: no motion");
                self.board.alert.silence();
                report.edge = Some(Edge::Falling);
            }
            None => {}
        }
    }

    /// Lifecycle state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Ticks completed since boot
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Connectivity supervisor
    pub fn connectivity(&self) -> &ConnectivitySupervisor {
        &self.connectivity
    }

    /// Light classifier
    pub fn light(&self) -> &LightClassifier {
        &self.light
    }

    /// Presence detector
    pub fn presence(&self) -> &PresenceDetector {
        &self.presence
    }

    /// Remote config poller
    pub fn poller(&self) -> &RemoteConfigPoller {
        &self.poller
    }

    /// Event reporter
    pub fn reporter(&self) -> &EventReporter {
        &self.reporter
    }

    /// Devices and transports
    pub fn board(&self) -> &Board<P> {
        &self.board
    }

    /// Devices and transports, mutably
    pub fn board_mut(&mut self) -> &mut Board<P> {
        &mut self.board
    }
}
