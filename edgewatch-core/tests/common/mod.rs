//! Simulated platform for control loop integration tests
//!
//! Every device shares one virtual clock: delays advance it, so blocking
//! reconnect waits finish instantly while timing stays observable. Outputs
//! and transports append to a shared journal to check ordering.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use edgewatch_core::{
    Actuator, Board, BusSession, ConfigSource, ConnectFailure, EventKind, EventRecord, EventSink,
    FetchError, LightSensor, NetworkLink, Platform, PublishError, ReportError, TimeSource, Timestamp,
};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};

/// Shared virtual time in milliseconds
pub type SimTime = Rc<Cell<u64>>;

/// Shared record of observable side effects, in order
pub type Journal = Rc<RefCell<Vec<String>>>;

/// Boot time used by every scenario
pub const START_MS: Timestamp = 10_000;

pub struct SimClock(pub SimTime);

impl TimeSource for SimClock {
    fn now(&self) -> Timestamp {
        self.0.get()
    }
}

/// Delay that advances virtual time instead of sleeping
pub struct SimDelay {
    pub time: SimTime,
    pub slept_ms: u64,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        let ms = u64::from(ns / 1_000_000);
        self.time.set(self.time.get() + ms);
        self.slept_ms += ms;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.time.set(self.time.get() + u64::from(ms));
        self.slept_ms += u64::from(ms);
    }
}

/// Network that comes up at `up_from`
pub struct SimNetwork {
    pub time: SimTime,
    pub up_from: Timestamp,
    pub begins: u32,
}

impl SimNetwork {
    /// Drop the link now and restore it after `outage_ms`
    pub fn outage(&mut self, outage_ms: u64) {
        self.up_from = self.time.get() + outage_ms;
    }
}

impl NetworkLink for SimNetwork {
    fn begin(&mut self) {
        self.begins += 1;
    }

    fn is_up(&mut self) -> bool {
        self.time.get() >= self.up_from
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

/// Broker session refusing the scripted failures before accepting
///
/// Each handshake takes `handshake_ms` of virtual time; `attempts` records
/// when every handshake started and ended.
pub struct SimBus {
    pub journal: Journal,
    pub time: SimTime,
    pub handshake_ms: u64,
    pub attempts: Vec<(Timestamp, Timestamp)>,
    pub connected: bool,
    pub refusals: VecDeque<ConnectFailure>,
    pub client_ids: Vec<String>,
    pub published: Vec<Published>,
    pub services: u32,
}

impl SimBus {
    pub fn on_topic(&self, topic: &str) -> Vec<&Published> {
        self.published.iter().filter(|p| p.topic == topic).collect()
    }

    pub fn payloads(&self, topic: &str) -> Vec<&str> {
        self.on_topic(topic).into_iter().map(|p| p.payload.as_str()).collect()
    }
}

impl BusSession for SimBus {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self, client_id: &str) -> Result<(), ConnectFailure> {
        self.client_ids.push(client_id.to_string());
        let started = self.time.get();
        self.time.set(started + self.handshake_ms);
        self.attempts.push((started, self.time.get()));
        if let Some(reason) = self.refusals.pop_front() {
            return Err(reason);
        }
        self.connected = true;
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError> {
        if !self.connected {
            return Err(PublishError::NotConnected);
        }
        self.journal.borrow_mut().push(format!("bus {} {}", topic, payload));
        self.published.push(Published {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        });
        Ok(())
    }

    fn service(&mut self) {
        self.services += 1;
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Posted {
    pub device_id: String,
    pub kind: EventKind,
    pub detail: Option<String>,
}

/// Collector serving a scripted sensing flag
pub struct SimCollector {
    pub journal: Journal,
    pub flag: Result<bool, FetchError>,
    pub post_status: Option<u16>,
    pub fetches: u32,
    pub posts: Vec<Posted>,
}

impl EventSink for SimCollector {
    fn post_event(&mut self, record: &EventRecord<'_>) -> Result<(), ReportError> {
        if let Some(status) = self.post_status {
            return Err(ReportError::Status { status });
        }
        self.journal.borrow_mut().push(format!("http {}", record.kind));
        self.posts.push(Posted {
            device_id: record.device_id.to_string(),
            kind: record.kind,
            detail: record.detail.map(str::to_string),
        });
        Ok(())
    }
}

impl ConfigSource for SimCollector {
    fn fetch_enabled(&mut self) -> Result<bool, FetchError> {
        self.fetches += 1;
        self.flag
    }
}

/// Presence input; `fail` makes reads return an error
pub struct SimPresence {
    pub level: bool,
    pub fail: bool,
}

impl ErrorType for SimPresence {
    type Error = ErrorKind;
}

impl InputPin for SimPresence {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        if self.fail {
            return Err(ErrorKind::Other);
        }
        Ok(self.level)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Light sensor replaying queued readings, then repeating the last one
pub struct SimLight {
    pub readings: VecDeque<f32>,
    pub last: f32,
}

impl SimLight {
    pub fn queue(&mut self, readings: &[f32]) {
        self.readings.extend(readings.iter().copied());
    }
}

impl LightSensor for SimLight {
    fn read_lux(&mut self) -> f32 {
        if let Some(next) = self.readings.pop_front() {
            self.last = next;
        }
        self.last
    }
}

pub struct SimAlert {
    pub journal: Journal,
    pub pulses: Vec<(u32, u32)>,
    pub silences: u32,
}

impl Actuator for SimAlert {
    fn pulse(&mut self, frequency_hz: u32, duration_ms: u32) {
        self.journal.borrow_mut().push("alert".to_string());
        self.pulses.push((frequency_hz, duration_ms));
    }

    fn silence(&mut self) {
        self.silences += 1;
    }

    fn is_active(&self) -> bool {
        false
    }
}

pub struct SimIndicator {
    pub journal: Journal,
    pub lit: bool,
}

impl ErrorType for SimIndicator {
    type Error = ErrorKind;
}

impl OutputPin for SimIndicator {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.lit = false;
        self.journal.borrow_mut().push("indicator off".to_string());
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.lit = true;
        self.journal.borrow_mut().push("indicator on".to_string());
        Ok(())
    }
}

pub struct SimPlatform;

impl Platform for SimPlatform {
    type Presence = SimPresence;
    type Light = SimLight;
    type Alert = SimAlert;
    type Indicator = SimIndicator;
    type Network = SimNetwork;
    type Bus = SimBus;
    type Collector = SimCollector;
    type Clock = SimClock;
    type Delay = SimDelay;
}

/// Board with the network up at boot, a willing broker and sensing enabled
pub fn sim_board() -> (Board<SimPlatform>, SimTime, Journal) {
    let time: SimTime = Rc::new(Cell::new(START_MS));
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));

    let board = Board {
        presence: SimPresence { level: false, fail: false },
        light: SimLight { readings: VecDeque::new(), last: 0.0 },
        alert: SimAlert { journal: journal.clone(), pulses: Vec::new(), silences: 0 },
        indicator: SimIndicator { journal: journal.clone(), lit: false },
        network: SimNetwork { time: time.clone(), up_from: START_MS, begins: 0 },
        bus: SimBus {
            journal: journal.clone(),
            time: time.clone(),
            handshake_ms: 0,
            attempts: Vec::new(),
            connected: false,
            refusals: VecDeque::new(),
            client_ids: Vec::new(),
            published: Vec::new(),
            services: 0,
        },
        collector: SimCollector {
            journal: journal.clone(),
            flag: Ok(true),
            post_status: None,
            fetches: 0,
            posts: Vec::new(),
        },
        clock: SimClock(time.clone()),
        delay: SimDelay { time: time.clone(), slept_ms: 0 },
    };

    (board, time, journal)
}

/// Move virtual time forward without ticking
pub fn advance(time: &SimTime, ms: u64) {
    time.set(time.get() + ms);
}
