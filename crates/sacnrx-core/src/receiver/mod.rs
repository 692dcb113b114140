//! One receiver binds a DMX channel range on a universe to a light sink.
//!
//! The output mode is resolved once at creation from the sink's
//! capabilities: fixtures decode a single value at the start channel, strips
//! decode up to `pixel_count` consecutive pixels. Timeouts are edge
//! triggered; the fallback runs once per silence.

mod config;
mod state;

use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::decode::{ChannelValue, Color, GammaTable, decode_channel, decode_pixels};
use crate::sink::LightSink;

pub use config::{
    ConfigError, DEFAULT_TIMEOUT_MS, FallbackPolicy, OutputMode, ReceiverConfig, TransportMode,
};
pub use state::{ReceiverState, TimeoutMonitor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("receiver is stopped")]
    Stopped,
    #[error("need {needed} channels from offset {offset}, universe carries {available}")]
    InsufficientData {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("sink no longer exposes an addressable strip")]
    SinkUnavailable,
}

/// Per-receiver counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReceiverCounters {
    pub packets_applied: u64,
    pub insufficient_data: u64,
    pub timeouts: u64,
}

/// Serializable view of a receiver, used for reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiverSnapshot {
    pub name: String,
    pub universe: u16,
    pub start_channel: u16,
    pub mode: OutputMode,
    pub fallback: FallbackPolicy,
    pub state: ReceiverState,
    pub counters: ReceiverCounters,
    pub last_values: Vec<Option<ChannelValue>>,
}

pub struct Receiver {
    config: ReceiverConfig,
    mode: OutputMode,
    fallback: FallbackPolicy,
    gamma: Option<GammaTable>,
    state: ReceiverState,
    monitor: TimeoutMonitor,
    external: Color,
    last_values: Vec<Option<ChannelValue>>,
    counters: ReceiverCounters,
    sink: Box<dyn LightSink>,
}

impl std::fmt::Debug for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

impl Receiver {
    /// Validate `config` against the sink and resolve the output mode.
    ///
    /// The sink is not touched until [`Receiver::start`].
    pub fn new(config: ReceiverConfig, mut sink: Box<dyn LightSink>) -> Result<Self, ConfigError> {
        config.validate()?;
        let mode = match sink.as_addressable() {
            Some(strip) => {
                let available = strip.pixel_count();
                if config.pixel_count > available {
                    return Err(ConfigError::PixelCountExceedsStrip {
                        pixel_count: config.pixel_count,
                        available,
                    });
                }
                OutputMode::Addressable
            }
            None if config.pixel_count > 1 => {
                return Err(ConfigError::NotAddressable {
                    pixel_count: config.pixel_count,
                });
            }
            None => OutputMode::Fixture,
        };
        let fallback = config.fallback.unwrap_or_else(|| mode.default_fallback());
        let gamma = config.gamma_enabled.then(|| GammaTable::new(config.gamma));
        let monitor = TimeoutMonitor::new(config.timeout_ms);
        let external = sink.external_state();
        Ok(Self {
            last_values: vec![None; config.pixel_count],
            config,
            mode,
            fallback,
            gamma,
            state: ReceiverState::Idle,
            monitor,
            external,
            counters: ReceiverCounters::default(),
            sink,
        })
    }

    /// Take control of the sink: snapshot its current state and blank it
    /// when configured to.
    pub fn start(&mut self) {
        self.external = self.sink.external_state();
        if self.config.blank_on_start {
            self.blank(true);
        }
        debug!(
            receiver = self.config.label(),
            universe = self.config.universe,
            start_channel = self.config.start_channel,
            mode = ?self.mode,
            "receiver started"
        );
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn fallback(&self) -> FallbackPolicy {
        self.fallback
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn counters(&self) -> ReceiverCounters {
        self.counters
    }

    /// Last decoded value per pixel; `None` for pixels never written.
    pub fn last_values(&self) -> &[Option<ChannelValue>] {
        &self.last_values
    }

    pub fn last_packet(&self) -> Option<Instant> {
        self.monitor.last_packet()
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        self.monitor.is_stale(now)
    }

    pub fn sink(&self) -> &dyn LightSink {
        self.sink.as_ref()
    }

    pub fn into_sink(self) -> Box<dyn LightSink> {
        self.sink
    }

    pub fn snapshot(&self) -> ReceiverSnapshot {
        ReceiverSnapshot {
            name: self.config.name.clone(),
            universe: self.config.universe,
            start_channel: self.config.start_channel,
            mode: self.mode,
            fallback: self.fallback,
            state: self.state,
            counters: self.counters,
            last_values: self.last_values.clone(),
        }
    }

    /// Apply one universe worth of DMX slots (start code excluded).
    ///
    /// Returns the number of pixels written. A packet that does not carry the
    /// receiver's first pixel is counted and leaves the output untouched; it
    /// does not refresh the timeout either.
    pub fn on_packet(&mut self, dmx: &[u8], now: Instant) -> Result<usize, DeliveryError> {
        if self.state == ReceiverState::Stopped {
            return Err(DeliveryError::Stopped);
        }
        let written = match self.mode {
            OutputMode::Fixture => self.apply_fixture(dmx),
            OutputMode::Addressable => self.apply_pixels(dmx),
        };
        let written = match written {
            Ok(written) => written,
            Err(err) => {
                if matches!(err, DeliveryError::InsufficientData { .. }) {
                    self.counters.insufficient_data += 1;
                }
                debug!(receiver = self.config.label(), %err, "packet not applied");
                return Err(err);
            }
        };
        self.sink.flush();
        self.monitor.arm(now);
        self.counters.packets_applied += 1;
        if self.state != ReceiverState::Active {
            debug!(
                receiver = self.config.label(),
                from = ?self.state,
                "receiver active"
            );
            self.state = ReceiverState::Active;
        }
        Ok(written)
    }

    /// Run the fallback if the stream went silent. Returns true the one time
    /// the timeout fires.
    pub fn check_timeout(&mut self, now: Instant) -> bool {
        if self.state != ReceiverState::Active || !self.monitor.poll(now) {
            return false;
        }
        debug!(
            receiver = self.config.label(),
            universe = self.config.universe,
            timeout_ms = self.config.timeout_ms,
            fallback = ?self.fallback,
            "stream timed out"
        );
        self.enter_fallback();
        true
    }

    /// Sender announced the end of the stream; fall back immediately.
    pub fn terminate(&mut self) -> bool {
        if self.state != ReceiverState::Active || !self.monitor.force() {
            return false;
        }
        debug!(
            receiver = self.config.label(),
            universe = self.config.universe,
            fallback = ?self.fallback,
            "stream terminated by source"
        );
        self.enter_fallback();
        true
    }

    /// Idempotent; later packets are refused.
    pub fn stop(&mut self) {
        if self.state == ReceiverState::Stopped {
            return;
        }
        self.state = ReceiverState::Stopped;
        debug!(receiver = self.config.label(), "receiver stopped");
    }

    fn apply_fixture(&mut self, dmx: &[u8]) -> Result<usize, DeliveryError> {
        let offset = self.config.channel_range().start;
        let channel_type = self.config.channel_type;
        // Mono fixtures drive brightness directly; the curve belongs to the sink.
        let gamma = match channel_type {
            crate::decode::ChannelType::Mono => None,
            _ => self.gamma.as_ref(),
        };
        let value = dmx
            .get(offset..)
            .and_then(|slots| decode_channel(channel_type, slots, gamma))
            .ok_or(DeliveryError::InsufficientData {
                offset,
                needed: channel_type.width(),
                available: dmx.len(),
            })?;
        let white = self.sink.capabilities().white;
        self.sink.set_color(value.to_color(white));
        self.sink.set_brightness(value.brightness(white));
        self.last_values[0] = Some(value);
        Ok(1)
    }

    fn apply_pixels(&mut self, dmx: &[u8]) -> Result<usize, DeliveryError> {
        let offset = self.config.channel_range().start;
        let channel_type = self.config.channel_type;
        let slots = dmx.get(offset..).unwrap_or_default();
        if slots.len() < channel_type.width() {
            return Err(DeliveryError::InsufficientData {
                offset,
                needed: channel_type.width(),
                available: dmx.len(),
            });
        }
        let white = self.sink.capabilities().white;
        let strip = self
            .sink
            .as_addressable()
            .ok_or(DeliveryError::SinkUnavailable)?;
        let mut written = 0;
        for (index, value) in decode_pixels(
            channel_type,
            slots,
            self.config.pixel_count,
            self.gamma.as_ref(),
        )
        .enumerate()
        {
            strip.set_pixel(index, value.to_color(white));
            self.last_values[index] = Some(value);
            written += 1;
        }
        Ok(written)
    }

    fn enter_fallback(&mut self) {
        self.counters.timeouts += 1;
        self.state = ReceiverState::TimedOut;
        match self.fallback {
            FallbackPolicy::RestoreExternal => self.sink.restore_external_state(self.external),
            FallbackPolicy::HoldLast => self.hold_last(),
            FallbackPolicy::Blank => self.blank(false),
        }
        self.sink.flush();
    }

    fn hold_last(&mut self) {
        let white = self.sink.capabilities().white;
        match self.mode {
            OutputMode::Fixture => {
                if let Some(value) = self.last_values[0] {
                    self.sink.set_color(value.to_color(white));
                    self.sink.set_brightness(value.brightness(white));
                }
            }
            OutputMode::Addressable => {
                if let Some(strip) = self.sink.as_addressable() {
                    for (index, value) in self.last_values.iter().enumerate() {
                        if let Some(value) = value {
                            strip.set_pixel(index, value.to_color(white));
                        }
                    }
                }
            }
        }
    }

    /// `whole_strip` clears every pixel of the sink; otherwise only the
    /// pixels this receiver drives.
    fn blank(&mut self, whole_strip: bool) {
        match self.mode {
            OutputMode::Fixture => {
                self.sink.set_color(Color::BLACK);
                self.sink.set_brightness(0.0);
            }
            OutputMode::Addressable => {
                let pixel_count = self.config.pixel_count;
                if let Some(strip) = self.sink.as_addressable() {
                    let count = if whole_strip {
                        strip.pixel_count()
                    } else {
                        pixel_count.min(strip.pixel_count())
                    };
                    for index in 0..count {
                        strip.set_pixel(index, Color::BLACK);
                    }
                }
            }
        }
        self.sink.flush();
    }
}
