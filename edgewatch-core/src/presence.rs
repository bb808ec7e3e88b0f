//! Presence Edge Detector
//!
//! Reports each physical transition of the presence signal exactly once.
//! Debouncing is implicit: the detector is sampled once per control-loop
//! tick, so anything that toggles faster than a tick is never seen.
//!
//! When sensing is disabled the control loop stops sampling the detector.
//! The remembered state is kept as-is, so re-enabling fires an edge only if
//! the signal differs from what was last seen.

/// Debounced presence state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// No presence
    Idle,
    /// Presence detected
    Active,
}

impl PresenceState {
    fn from_raw(raw: bool) -> Self {
        if raw {
            PresenceState::Active
        } else {
            PresenceState::Idle
        }
    }
}

/// Direction of a presence transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Idle to Active
    Rising,
    /// Active to Idle
    Falling,
}

/// Edge detector over a boolean presence signal
#[derive(Debug, Clone)]
pub struct PresenceDetector {
    state: PresenceState,
}

impl Default for PresenceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceDetector {
    /// Detector in the boot state (`Idle`)
    pub const fn new() -> Self {
        Self { state: PresenceState::Idle }
    }

    /// Feed one raw sample; returns the edge it caused, if any
    pub fn sample(&mut self, raw: bool) -> Option<Edge> {
        let next = PresenceState::from_raw(raw);
        if next == self.state {
            return None;
        }
        self.state = next;
        Some(match next {
            PresenceState::Active => Edge::Rising,
            PresenceState::Idle => Edge::Falling,
        })
    }

    /// Last recorded state
    pub fn state(&self) -> PresenceState {
        self.state
    }
}
