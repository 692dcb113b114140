//! The listener owns the datagram source and the receiver registry.
//!
//! Each [`Listener::tick`] drains up to `max_datagrams_per_tick` datagrams,
//! records each sender as a live stream, validates the datagrams, routes valid
//! frames by universe and then runs every receiver's timeout check. The source is opened with the first receiver and
//! closed with the last; multicast groups are joined per universe while at
//! least one multicast receiver needs them.

mod stats;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::protocols::sacn::{ValidationRules, validate_sacn_dmx};
use crate::receiver::{
    ConfigError, Receiver, ReceiverConfig, ReceiverSnapshot, TransportMode,
};
use crate::router::{ReceiverHandle, RouterOptions, UniverseRouter};
use crate::sink::LightSink;
use crate::source::{DatagramSource, SourceError};

pub use stats::{ListenerStats, TickSummary};

pub const DEFAULT_MAX_DATAGRAMS_PER_TICK: usize = 1024;
pub const DEFAULT_STREAM_IDLE_MS: u64 = 5000;
/// Larger than any E1.31 data packet; longer datagrams are truncated.
pub const RECV_BUFFER_SIZE: usize = 1500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerOptions {
    pub rules: ValidationRules,
    pub router: RouterOptions,
    pub max_datagrams_per_tick: usize,
    /// Silence after which a sender is logged as stopped.
    pub stream_idle: Duration,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            rules: ValidationRules::default(),
            router: RouterOptions::default(),
            max_datagrams_per_tick: DEFAULT_MAX_DATAGRAMS_PER_TICK,
            stream_idle: Duration::from_millis(DEFAULT_STREAM_IDLE_MS),
        }
    }
}

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid receiver configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("datagram source failed: {0}")]
    Source(#[from] SourceError),
    #[error("unknown receiver {0}")]
    UnknownReceiver(ReceiverHandle),
}

pub struct Listener<S> {
    source: S,
    options: ListenerOptions,
    router: UniverseRouter,
    stats: ListenerStats,
    streams: HashMap<SocketAddr, Instant>,
    buf: Vec<u8>,
    open: bool,
}

impl<S: DatagramSource> Listener<S> {
    pub fn new(source: S, options: ListenerOptions) -> Self {
        let router = UniverseRouter::new(options.router);
        Self {
            source,
            options,
            router,
            stats: ListenerStats::default(),
            streams: HashMap::new(),
            buf: vec![0; RECV_BUFFER_SIZE],
            open: false,
        }
    }

    pub fn options(&self) -> &ListenerOptions {
        &self.options
    }

    pub fn stats(&self) -> &ListenerStats {
        &self.stats
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn receiver(&self, handle: ReceiverHandle) -> Option<&Receiver> {
        self.router.get(handle)
    }

    pub fn receiver_count(&self) -> usize {
        self.router.len()
    }

    /// Snapshots in universe order, then creation order.
    pub fn snapshots(&self) -> Vec<ReceiverSnapshot> {
        self.router
            .handles()
            .into_iter()
            .filter_map(|handle| self.router.get(handle).map(Receiver::snapshot))
            .collect()
    }

    /// Validate and register a receiver, opening the source on first use.
    ///
    /// Nothing is registered and the sink is untouched when this fails.
    pub fn create_receiver(
        &mut self,
        config: ReceiverConfig,
        sink: Box<dyn LightSink>,
    ) -> Result<ReceiverHandle, ListenerError> {
        let receiver = Receiver::new(config, sink)?;
        self.router.check_overlap(receiver.config())?;

        let universe = receiver.config().universe;
        let opened_here = !self.open;
        if opened_here {
            self.source.open()?;
            self.open = true;
        }
        if receiver.config().transport == TransportMode::Multicast
            && self.router.multicast_subscribers(universe) == 0
        {
            if let Err(err) = self.source.join_universe(universe) {
                if opened_here {
                    self.close_source();
                }
                return Err(err.into());
            }
        }

        let handle = self.router.register(receiver)?;
        if let Some(receiver) = self.router.get_mut(handle) {
            receiver.start();
        }
        debug!(%handle, universe, "receiver registered");
        Ok(handle)
    }

    /// Stop and unregister a receiver, handing it back with its sink.
    pub fn destroy_receiver(&mut self, handle: ReceiverHandle) -> Result<Receiver, ListenerError> {
        let mut receiver = self
            .router
            .unregister(handle)
            .ok_or(ListenerError::UnknownReceiver(handle))?;
        receiver.stop();

        let universe = receiver.config().universe;
        if receiver.config().transport == TransportMode::Multicast
            && self.router.multicast_subscribers(universe) == 0
        {
            if let Err(err) = self.source.leave_universe(universe) {
                warn!(universe, %err, "could not leave multicast group");
            }
        }
        if self.router.is_empty() {
            self.close_source();
        }
        Ok(receiver)
    }

    pub fn tick(&mut self) -> Result<TickSummary, ListenerError> {
        self.tick_at(Instant::now())
    }

    /// One processing cycle at an explicit instant.
    pub fn tick_at(&mut self, now: Instant) -> Result<TickSummary, ListenerError> {
        let mut summary = TickSummary::default();
        if self.open {
            while summary.datagrams < self.options.max_datagrams_per_tick {
                let Some(datagram) = self.source.next_datagram(&mut self.buf)? else {
                    break;
                };
                summary.datagrams += 1;
                self.stats.datagrams += 1;
                if self.streams.insert(datagram.source, now).is_none() {
                    self.stats.streams_started += 1;
                    info!(source = %datagram.source, "started receiving sACN data");
                }

                let payload = &self.buf[..datagram.len];
                let frame = match validate_sacn_dmx(payload, &self.options.rules) {
                    Ok(frame) => frame,
                    Err(reason) => {
                        trace!(source = %datagram.source, %reason, "datagram rejected");
                        summary.rejected += 1;
                        self.stats.record_reject(reason.kind());
                        continue;
                    }
                };
                summary.accepted += 1;
                trace!(
                    source = %datagram.source,
                    name = frame.source_name.as_deref().unwrap_or(""),
                    cid = %frame.cid_hex(),
                    universe = frame.universe,
                    sequence = frame.sequence,
                    priority = frame.priority,
                    slots = frame.channel_count(),
                    "frame"
                );

                let outcome = self.router.route(&frame, now);
                summary.delivered += outcome.delivered;
                self.stats.record_route(&outcome);
            }
        }
        self.expire_streams(now);

        summary.timeouts = self.router.check_timeouts(now);
        self.stats.timeouts += summary.timeouts as u64;
        Ok(summary)
    }

    fn expire_streams(&mut self, now: Instant) {
        let idle = self.options.stream_idle;
        let before = self.streams.len();
        self.streams.retain(|source, last| {
            let alive = now.saturating_duration_since(*last) <= idle;
            if !alive {
                info!(source = %source, "stopped receiving sACN data");
            }
            alive
        });
        self.stats.streams_stopped += (before - self.streams.len()) as u64;
    }

    fn close_source(&mut self) {
        if self.open {
            self.source.close();
            self.open = false;
            self.streams.clear();
        }
    }
}
