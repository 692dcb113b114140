//! Channel decoding: DMX slot bytes to normalized color/brightness values.
//!
//! One decoder per [`ChannelType`], selected through a function table; the
//! optional gamma LUT is applied to raw bytes before normalization.

mod channel;
mod color;
mod gamma;

pub use channel::{ChannelType, ChannelValue, MAX_CHANNEL_WIDTH, decode_channel, decode_pixels};
pub use color::{Color, WhiteChannels};
pub use gamma::{DEFAULT_GAMMA, GammaTable};
