//! State-change events produced by the detectors
//!
//! An [`Event`] is created when a detector reports a transition, handed to
//! the reporter exactly once, and dropped whether or not any channel accepted
//! it. There is no queue: at most one event per detector is in flight per
//! tick.
//!
//! ```text
//! PresenceDetector ──Rising──▶ Event::motion() ──▶ EventReporter ──▶ bus + HTTP
//! LightClassifier  ──On/Off──▶ Event::light(s) ──▶ EventReporter ──▶ bus + HTTP
//! ```
//!
//! Detail strings are part of the collector contract: the collector derives
//! the current light state from the detail of the last `light` event, so they
//! must stay exactly `"ON"` and `"OFF"`.

use core::fmt;

use crate::light::LightState;

/// Category of a reported event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EventKind {
    /// Presence rising edge
    Motion,
    /// Light on/off transition
    Light,
}

impl EventKind {
    /// Wire name used by the collector
    pub const fn name(&self) -> &'static str {
        match self {
            EventKind::Motion => "motion",
            EventKind::Light => "light",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Detail attached to motion events
pub const MOTION_DETAIL: &str = "motion detected";

/// Bus payload for motion events
pub const MOTION_BUS_PAYLOAD: &str = "MOTION detected";

/// Immutable state-change record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    kind: EventKind,
    detail: &'static str,
}

impl Event {
    /// Presence rising edge
    pub const fn motion() -> Self {
        Self { kind: EventKind::Motion, detail: MOTION_DETAIL }
    }

    /// Light switched to `state`
    pub const fn light(state: LightState) -> Self {
        Self { kind: EventKind::Light, detail: state.label() }
    }

    /// Event category
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Human-readable detail
    pub const fn detail(&self) -> &'static str {
        self.detail
    }

    /// Attach the reporting device's identity for the HTTP channel
    pub fn record<'a>(&self, device_id: &'a str) -> EventRecord<'a> {
        EventRecord {
            device_id,
            kind: self.kind,
            detail: Some(self.detail),
        }
    }
}

/// Event as sent to the collector: `{device_id, type, detail?}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord<'a> {
    /// Identity of the reporting node
    pub device_id: &'a str,
    /// Event category (`type` on the wire)
    pub kind: EventKind,
    /// Optional free-form detail
    pub detail: Option<&'a str>,
}
