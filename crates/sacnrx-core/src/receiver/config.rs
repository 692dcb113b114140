use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::{ChannelType, DEFAULT_GAMMA};
use crate::protocols::sacn::layout;

pub const DEFAULT_TIMEOUT_MS: u64 = 2500;

/// What a receiver does to its output once the stream times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Hand the output back to the state captured when the receiver started.
    RestoreExternal,
    /// Keep showing the last decoded values.
    HoldLast,
    /// Drive every channel to zero.
    Blank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    #[default]
    Unicast,
    Multicast,
}

/// Whether the sink is a single fixture or an addressable strip; resolved once
/// when the receiver is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Fixture,
    Addressable,
}

impl OutputMode {
    pub fn default_fallback(self) -> FallbackPolicy {
        match self {
            OutputMode::Fixture => FallbackPolicy::RestoreExternal,
            OutputMode::Addressable => FallbackPolicy::HoldLast,
        }
    }
}

/// Immutable receiver settings.
///
/// # Examples
/// ```
/// use sacnrx_core::decode::ChannelType;
/// use sacnrx_core::receiver::ReceiverConfig;
///
/// let config = ReceiverConfig {
///     universe: 2,
///     start_channel: 10,
///     channel_type: ChannelType::Rgbw,
///     pixel_count: 3,
///     ..ReceiverConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.channel_range(), 9..21);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    pub name: String,
    pub universe: u16,
    /// 1-based DMX channel of the first slot.
    pub start_channel: u16,
    pub channel_type: ChannelType,
    pub pixel_count: usize,
    /// Zero disables the timeout.
    pub timeout_ms: u64,
    pub gamma_enabled: bool,
    pub gamma: f32,
    /// `None` picks the default for the output mode.
    pub fallback: Option<FallbackPolicy>,
    pub transport: TransportMode,
    pub blank_on_start: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            universe: layout::MIN_UNIVERSE,
            start_channel: 1,
            channel_type: ChannelType::default(),
            pixel_count: 1,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            gamma_enabled: false,
            gamma: DEFAULT_GAMMA,
            fallback: None,
            transport: TransportMode::default(),
            blank_on_start: true,
        }
    }
}

impl ReceiverConfig {
    /// Zero-based slot range within the universe.
    pub fn channel_range(&self) -> Range<usize> {
        let start = usize::from(self.start_channel.saturating_sub(1));
        start..start + self.channel_type.width() * self.pixel_count
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(layout::MIN_UNIVERSE..=layout::MAX_UNIVERSE).contains(&self.universe) {
            return Err(ConfigError::UniverseOutOfRange {
                universe: self.universe,
            });
        }
        if self.start_channel == 0 || usize::from(self.start_channel) > layout::DMX_MAX_SLOTS {
            return Err(ConfigError::StartChannelOutOfRange {
                start_channel: self.start_channel,
            });
        }
        if self.pixel_count == 0 {
            return Err(ConfigError::ZeroPixelCount);
        }
        let range = self.channel_range();
        if range.end > layout::DMX_MAX_SLOTS {
            return Err(ConfigError::RangeExceedsUniverse {
                start_channel: self.start_channel,
                end_channel: range.end,
            });
        }
        if self.gamma_enabled && !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(ConfigError::InvalidGamma { gamma: self.gamma });
        }
        Ok(())
    }

    pub(crate) fn label(&self) -> &str {
        if self.name.is_empty() {
            "<unnamed>"
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("universe {universe} outside 1..=63999")]
    UniverseOutOfRange { universe: u16 },
    #[error("start channel {start_channel} outside 1..=512")]
    StartChannelOutOfRange { start_channel: u16 },
    #[error("pixel count must be at least 1")]
    ZeroPixelCount,
    #[error("channels {start_channel}..={end_channel} run past channel 512")]
    RangeExceedsUniverse { start_channel: u16, end_channel: usize },
    #[error("gamma must be a positive number, got {gamma}")]
    InvalidGamma { gamma: f32 },
    #[error("{pixel_count} pixels configured but the output is not addressable")]
    NotAddressable { pixel_count: usize },
    #[error("{pixel_count} pixels configured but the strip only has {available}")]
    PixelCountExceedsStrip { pixel_count: usize, available: usize },
    #[error("channels {start}..={end} on universe {universe} overlap receiver '{other}'")]
    OverlappingRange {
        universe: u16,
        start: usize,
        end: usize,
        other: String,
    },
}
