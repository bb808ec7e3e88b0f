//! Event Reporter
//!
//! Best-effort dispatch of state-change events over two independent
//! channels:
//!
//! | Channel | Target                          | Retain | On failure   |
//! |---------|---------------------------------|--------|--------------|
//! | Bus     | events topic (motion)           | no     | log, count   |
//! | Bus     | light-state topic (`ON`/`OFF`)  | yes    | log, count   |
//! | HTTP    | `POST /api/events`              | n/a    | log, count   |
//!
//! Both channels are always attempted. Partial delivery is a normal outcome,
//! nothing is retried, and the local state change that produced the event is
//! never rolled back.

use core::fmt::Write;

use heapless::String;

use crate::config::Topics;
use crate::connectivity::ClientId;
use crate::errors::PublishError;
use crate::events::{Event, EventKind, MOTION_BUS_PAYLOAD};
use crate::traits::{BusSession, EventSink};

/// Outcome of one report
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Bus accepted the publish
    pub bus: bool,
    /// Collector answered 2xx
    pub http: bool,
}

impl Delivery {
    /// At least one channel accepted the event
    pub fn reported(&self) -> bool {
        self.bus || self.http
    }
}

/// Delivery counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReportStats {
    /// Bus publishes accepted
    pub bus_ok: u32,
    /// Bus publishes rejected
    pub bus_failed: u32,
    /// HTTP reports accepted
    pub http_ok: u32,
    /// HTTP reports rejected
    pub http_failed: u32,
    /// Telemetry publishes rejected
    pub telemetry_failed: u32,
}

/// Dispatches events to the bus and the collector
#[derive(Debug, Clone)]
pub struct EventReporter {
    device_id: ClientId,
    topics: Topics,
    stats: ReportStats,
}

impl EventReporter {
    /// Reporter signing events with `device_id`
    pub fn new(device_id: ClientId, topics: Topics) -> Self {
        Self {
            device_id,
            topics,
            stats: ReportStats::default(),
        }
    }

    /// Identity attached to HTTP reports
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Counters since boot
    pub fn stats(&self) -> &ReportStats {
        &self.stats
    }

    /// Attempt both channels once
    pub fn report<B, S>(&mut self, event: &Event, bus: &mut B, sink: &mut S) -> Delivery
    where
        B: BusSession + ?Sized,
        S: EventSink + ?Sized,
    {
        let (topic, payload, retain) = match event.kind() {
            EventKind::Motion => (self.topics.events, MOTION_BUS_PAYLOAD, false),
            EventKind::Light => (self.topics.light_state, event.detail(), true),
        };

        let bus_ok = match bus.publish(topic, payload, retain) {
            Ok(()) => {
                self.stats.bus_ok += 1;
                log_info!("bus: publish '{}' -> {} OK", payload, topic);
                true
            }
            Err(err) => {
                self.stats.bus_failed += 1;
                log_warn!("bus: publish '{}' -> {} FAILED: {}", payload, topic, err);
                false
            }
        };

        let http_ok = match sink.post_event(&event.record(&self.device_id)) {
            Ok(()) => {
                self.stats.http_ok += 1;
                log_info!("http: {} event reported", event.kind());
                true
            }
            Err(err) => {
                self.stats.http_failed += 1;
                log_warn!("http: {} event FAILED: {}", event.kind(), err);
                false
            }
        };

        Delivery { bus: bus_ok, http: http_ok }
    }

    /// Publish a valid illuminance reading as retained telemetry
    pub fn publish_lux<B>(&mut self, lux: f32, bus: &mut B) -> Result<(), PublishError>
    where
        B: BusSession + ?Sized,
    {
        let mut payload: String<16> = String::new();
        write!(payload, "{:.1}", lux).map_err(|_| PublishError::PayloadTooLarge)?;

        bus.publish(self.topics.light_level, &payload, true).map_err(|err| {
            self.stats.telemetry_failed += 1;
            log_debug!("bus: lux telemetry FAILED: {}", err);
            err
        })
    }
}
