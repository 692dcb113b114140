//! Universe-to-receiver dispatch.
//!
//! Receivers are owned by the router and addressed through opaque
//! [`ReceiverHandle`]s. Per universe, delivery follows registration order.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::protocols::sacn::ValidatedFrame;
use crate::receiver::{ConfigError, DeliveryError, Receiver, ReceiverConfig, TransportMode};

/// Stable receiver identity; never reused within a router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReceiverHandle(u64);

impl ReceiverHandle {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReceiverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterOptions {
    pub allow_overlapping_ranges: bool,
    pub ignore_preview: bool,
    pub honor_stream_terminated: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            allow_overlapping_ranges: false,
            ignore_preview: true,
            honor_stream_terminated: true,
        }
    }
}

/// What happened to one validated frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteOutcome {
    /// Receivers registered on the frame's universe.
    pub matched: usize,
    pub delivered: usize,
    pub insufficient_data: usize,
    pub preview_skipped: bool,
    /// Receivers sent to fallback by a stream-terminated frame.
    pub terminated: usize,
}

#[derive(Debug, Default)]
pub struct UniverseRouter {
    options: RouterOptions,
    receivers: HashMap<ReceiverHandle, Receiver>,
    routes: HashMap<u16, Vec<ReceiverHandle>>,
    next_handle: u64,
}

impl UniverseRouter {
    pub fn new(options: RouterOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> RouterOptions {
        self.options
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    pub fn get(&self, handle: ReceiverHandle) -> Option<&Receiver> {
        self.receivers.get(&handle)
    }

    pub fn get_mut(&mut self, handle: ReceiverHandle) -> Option<&mut Receiver> {
        self.receivers.get_mut(&handle)
    }

    /// Handles in universe order, then registration order.
    pub fn handles(&self) -> Vec<ReceiverHandle> {
        let mut universes: Vec<_> = self.routes.keys().copied().collect();
        universes.sort_unstable();
        universes
            .into_iter()
            .flat_map(|universe| self.routes[&universe].iter().copied())
            .collect()
    }

    pub fn universes(&self) -> impl Iterator<Item = u16> + '_ {
        self.routes.keys().copied()
    }

    /// Receivers on `universe` that asked for multicast delivery.
    pub fn multicast_subscribers(&self, universe: u16) -> usize {
        self.routes.get(&universe).map_or(0, |handles| {
            handles
                .iter()
                .filter(|handle| {
                    self.receivers
                        .get(handle)
                        .is_some_and(|r| r.config().transport == TransportMode::Multicast)
                })
                .count()
        })
    }

    /// Reject `config` if its channel range intersects a receiver already on
    /// the same universe.
    pub fn check_overlap(&self, config: &ReceiverConfig) -> Result<(), ConfigError> {
        if self.options.allow_overlapping_ranges {
            return Ok(());
        }
        let range = config.channel_range();
        let Some(handles) = self.routes.get(&config.universe) else {
            return Ok(());
        };
        for handle in handles {
            let Some(existing) = self.receivers.get(handle) else {
                continue;
            };
            let other = existing.config().channel_range();
            if range.start < other.end && other.start < range.end {
                return Err(ConfigError::OverlappingRange {
                    universe: config.universe,
                    start: range.start + 1,
                    end: range.end,
                    other: existing.config().label().to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn register(&mut self, receiver: Receiver) -> Result<ReceiverHandle, ConfigError> {
        self.check_overlap(receiver.config())?;
        self.next_handle += 1;
        let handle = ReceiverHandle(self.next_handle);
        self.routes
            .entry(receiver.config().universe)
            .or_default()
            .push(handle);
        self.receivers.insert(handle, receiver);
        Ok(handle)
    }

    /// Remove a receiver. Its universe entry disappears with its last
    /// receiver.
    pub fn unregister(&mut self, handle: ReceiverHandle) -> Option<Receiver> {
        let receiver = self.receivers.remove(&handle)?;
        let universe = receiver.config().universe;
        if let Some(handles) = self.routes.get_mut(&universe) {
            handles.retain(|h| *h != handle);
            if handles.is_empty() {
                self.routes.remove(&universe);
            }
        }
        Some(receiver)
    }

    /// Deliver a validated frame to every receiver on its universe.
    pub fn route(&mut self, frame: &ValidatedFrame<'_>, now: Instant) -> RouteOutcome {
        let Some(handles) = self.routes.get(&frame.universe) else {
            trace!(universe = frame.universe, "no receiver for universe");
            return RouteOutcome::default();
        };
        let mut outcome = RouteOutcome {
            matched: handles.len(),
            ..RouteOutcome::default()
        };
        if frame.is_preview() && self.options.ignore_preview {
            outcome.preview_skipped = true;
            return outcome;
        }
        let terminated = frame.is_stream_terminated() && self.options.honor_stream_terminated;
        for handle in handles {
            let Some(receiver) = self.receivers.get_mut(handle) else {
                continue;
            };
            if terminated {
                if receiver.terminate() {
                    outcome.terminated += 1;
                }
                continue;
            }
            match receiver.on_packet(frame.dmx, now) {
                Ok(_) => outcome.delivered += 1,
                Err(DeliveryError::InsufficientData { .. }) => outcome.insufficient_data += 1,
                Err(_) => {}
            }
        }
        outcome
    }

    /// Returns the number of receivers whose timeout fired.
    pub fn check_timeouts(&mut self, now: Instant) -> usize {
        self.receivers
            .values_mut()
            .filter_map(|receiver| receiver.check_timeout(now).then_some(()))
            .count()
    }
}
