//! Time management for the control loop
//!
//! Every cadence in the node (light sampling, config polling, connection
//! backoff) is measured against a monotonic millisecond counter, never wall
//! time. The counter is a `u32`-style wrapping quantity on small MCUs, so all
//! comparisons go through `elapsed_since`, which tolerates wraparound.

/// Timestamp in milliseconds since an arbitrary origin (usually boot)
pub type Timestamp = u64;

/// Source of monotonic time for the system
pub trait TimeSource {
    /// Current time in milliseconds
    fn now(&self) -> Timestamp;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Milliseconds from `earlier` to `now`, wrap-safe
#[inline]
pub fn elapsed_since(now: Timestamp, earlier: Timestamp) -> u64 {
    now.wrapping_sub(earlier)
}

/// Monotonic clock backed by `std::time::Instant` (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl SystemClock {
    /// Clock whose origin is the moment of construction
    pub fn new() -> Self {
        Self { origin: std::time::Instant::now() }
    }
}

#[cfg(feature = "std")]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    /// Source frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Move forward by `ms`
    pub fn advance(&mut self, ms: u64) {
        self.timestamp = self.timestamp.wrapping_add(ms);
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

/// Fixed-period gate for work that runs less often than every tick
///
/// A cadence that has never fired is due immediately. After firing it is due
/// again once `period_ms` has elapsed since the last firing.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    period_ms: u64,
    last: Option<Timestamp>,
}

impl Cadence {
    /// Cadence that is due on the first check
    pub const fn new(period_ms: u64) -> Self {
        Self { period_ms, last: None }
    }

    /// Cadence whose first firing is one period after `at`
    pub const fn starting_at(period_ms: u64, at: Timestamp) -> Self {
        Self { period_ms, last: Some(at) }
    }

    /// Period in milliseconds
    pub const fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Whether the period has elapsed, without consuming it
    pub fn is_due(&self, now: Timestamp) -> bool {
        match self.last {
            None => true,
            Some(last) => elapsed_since(now, last) >= self.period_ms,
        }
    }

    /// Returns true and restarts the period if it has elapsed
    pub fn fire(&mut self, now: Timestamp) -> bool {
        if self.is_due(now) {
            self.last = Some(now);
            true
        } else {
            false
        }
    }

    /// Milliseconds until the cadence is next due (0 if already due)
    pub fn remaining(&self, now: Timestamp) -> u64 {
        match self.last {
            None => 0,
            Some(last) => self.period_ms.saturating_sub(elapsed_since(now, last)),
        }
    }

    /// Restart the period at `now` without checking
    pub fn reset(&mut self, now: Timestamp) {
        self.last = Some(now);
    }
}
