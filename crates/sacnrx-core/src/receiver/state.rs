use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverState {
    /// No packet applied yet.
    Idle,
    Active,
    /// Fallback already applied for the current silence.
    TimedOut,
    /// Terminal.
    Stopped,
}

/// Edge-triggered staleness detector.
///
/// `poll` reports a timeout once per silence; the next `arm` starts a new
/// episode.
#[derive(Debug, Clone)]
pub struct TimeoutMonitor {
    timeout: Option<Duration>,
    last_packet: Option<Instant>,
    fired: bool,
}

impl TimeoutMonitor {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            last_packet: None,
            fired: false,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        self.last_packet = Some(now);
        self.fired = false;
    }

    pub fn last_packet(&self) -> Option<Instant> {
        self.last_packet
    }

    /// True while more than the timeout has elapsed since the last packet.
    /// Never true when disabled or before the first packet.
    pub fn is_stale(&self, now: Instant) -> bool {
        match (self.timeout, self.last_packet) {
            (Some(timeout), Some(last)) => now.saturating_duration_since(last) > timeout,
            _ => false,
        }
    }

    /// Returns true exactly once per timeout episode.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.fired || !self.is_stale(now) {
            return false;
        }
        self.fired = true;
        true
    }

    /// Fire immediately, e.g. when the sender announces termination.
    pub fn force(&mut self) -> bool {
        if self.fired || self.last_packet.is_none() {
            return false;
        }
        self.fired = true;
        true
    }
}
