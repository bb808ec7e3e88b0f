//! Remote Config Poller
//!
//! Keeps the locally cached *sensing enabled* flag in step with the
//! collector. The flag is seeded once at boot and then refreshed on its own
//! fixed cadence, independent of sensor sampling.
//!
//! Failure policy: a failed fetch leaves the flag exactly as it was. There is
//! no out-of-band retry; the next scheduled poll is the retry.

use crate::errors::FetchError;
use crate::time::{Cadence, Timestamp};
use crate::traits::ConfigSource;

/// Poll statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollStats {
    /// Fetches that returned a value
    pub successes: u32,
    /// Fetches that failed or were skipped for lack of network
    pub failures: u32,
    /// Successful fetches that changed the flag
    pub changes: u32,
    /// Most recent failure
    pub last_error: Option<FetchError>,
}

/// Owner of the sensing-enabled flag
#[derive(Debug, Clone)]
pub struct RemoteConfigPoller {
    enabled: bool,
    cadence: Cadence,
    stats: PollStats,
}

impl RemoteConfigPoller {
    /// Poller holding `initial` until seeded
    pub fn new(initial: bool, interval_ms: u64) -> Self {
        Self {
            enabled: initial,
            cadence: Cadence::new(interval_ms),
            stats: PollStats::default(),
        }
    }

    /// Current flag
    pub fn sensing_enabled(&self) -> bool {
        self.enabled
    }

    /// Counters since boot
    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    /// One fetch, skipped with `NetworkUnavailable` when the network is not ready
    pub fn try_fetch_enabled<S>(network_ready: bool, source: &mut S) -> Result<bool, FetchError>
    where
        S: ConfigSource + ?Sized,
    {
        if !network_ready {
            return Err(FetchError::NetworkUnavailable);
        }
        source.fetch_enabled()
    }

    /// Boot-time seed: take the remote value, or `fallback` if the fetch fails
    ///
    /// The next refresh is scheduled one interval after `now`.
    pub fn seed<S>(&mut self, now: Timestamp, network_ready: bool, fallback: bool, source: &mut S) -> bool
    where
        S: ConfigSource + ?Sized,
    {
        self.enabled = match Self::try_fetch_enabled(network_ready, source) {
            Ok(enabled) => {
                self.stats.successes += 1;
                log_info!("config: sensing {} (remote)", on_off(enabled));
                enabled
            }
            Err(err) => {
                self.record_failure(err);
                log_warn!("config: boot fetch failed ({}), sensing {} (default)", err, on_off(fallback));
                fallback
            }
        };
        self.cadence.reset(now);
        self.enabled
    }

    /// Whether a scheduled refresh is due
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.cadence.is_due(now)
    }

    /// Refresh if the cadence has elapsed
    ///
    /// Returns `Some(new_value)` only when a successful fetch changed the
    /// flag; unchanged values and failures return `None`.
    pub fn refresh<S>(&mut self, now: Timestamp, network_ready: bool, source: &mut S) -> Option<bool>
    where
        S: ConfigSource + ?Sized,
    {
        if !self.cadence.fire(now) {
            return None;
        }

        match Self::try_fetch_enabled(network_ready, source) {
            Ok(enabled) => {
                self.stats.successes += 1;
                if enabled == self.enabled {
                    return None;
                }
                self.enabled = enabled;
                self.stats.changes += 1;
                log_info!("config: sensing {}", if enabled { "ENABLED" } else { "DISABLED" });
                Some(enabled)
            }
            Err(err) => {
                self.record_failure(err);
                log_debug!("config: poll failed ({}), keeping sensing {}", err, on_off(self.enabled));
                None
            }
        }
    }

    fn record_failure(&mut self, err: FetchError) {
        self.stats.failures += 1;
        self.stats.last_error = Some(err);
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
