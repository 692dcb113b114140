use serde::{Deserialize, Serialize};

use super::color::{Color, WhiteChannels, normalize};
use super::gamma::GammaTable;

/// Channel layout of one fixture or pixel. The discriminant is the width in
/// DMX slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelType {
    Mono = 1,
    #[default]
    Rgb = 3,
    Rgbw = 4,
    Rgbww = 5,
}

pub const MAX_CHANNEL_WIDTH: usize = 5;

type DecodeFn = fn(&[u8]) -> ChannelValue;

impl ChannelType {
    pub fn width(self) -> usize {
        self as usize
    }

    fn decoder(self) -> DecodeFn {
        match self {
            ChannelType::Mono => decode_mono,
            ChannelType::Rgb => decode_rgb,
            ChannelType::Rgbw => decode_rgbw,
            ChannelType::Rgbww => decode_rgbww,
        }
    }
}

/// One decoded fixture or pixel, channels normalized to `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelValue {
    Mono {
        brightness: f32,
    },
    Rgb {
        red: f32,
        green: f32,
        blue: f32,
    },
    Rgbw {
        red: f32,
        green: f32,
        blue: f32,
        white: f32,
    },
    Rgbww {
        red: f32,
        green: f32,
        blue: f32,
        cold_white: f32,
        warm_white: f32,
    },
}

impl ChannelValue {
    /// Map onto a sink color for the given white support.
    ///
    /// Mono becomes gray. Two white channels fold to `max(cold, warm)` on a
    /// single-white sink; white is dropped entirely on RGB-only sinks.
    pub fn to_color(&self, white: WhiteChannels) -> Color {
        match *self {
            ChannelValue::Mono { brightness } => Color::gray(brightness),
            ChannelValue::Rgb { red, green, blue } => Color::rgb(red, green, blue),
            ChannelValue::Rgbw {
                red,
                green,
                blue,
                white: w,
            } => Color {
                white: if white == WhiteChannels::None { 0.0 } else { w },
                ..Color::rgb(red, green, blue)
            },
            ChannelValue::Rgbww {
                red,
                green,
                blue,
                cold_white,
                warm_white,
            } => match white {
                WhiteChannels::None => Color::rgb(red, green, blue),
                WhiteChannels::Single => Color {
                    white: cold_white.max(warm_white),
                    ..Color::rgb(red, green, blue)
                },
                WhiteChannels::ColdWarm => Color {
                    white: cold_white,
                    warm_white,
                    ..Color::rgb(red, green, blue)
                },
            },
        }
    }

    /// Master brightness for a non-addressable sink.
    ///
    /// White-capable sinks driven by a white channel type get full brightness
    /// so the channels are not scaled twice; sinks without white control get
    /// the brightest channel.
    pub fn brightness(&self, white: WhiteChannels) -> f32 {
        match *self {
            ChannelValue::Mono { brightness } => brightness,
            ChannelValue::Rgb { red, green, blue } => red.max(green).max(blue),
            ChannelValue::Rgbw {
                red,
                green,
                blue,
                white: w,
            } => match white {
                WhiteChannels::None => red.max(green).max(blue).max(w),
                _ => 1.0,
            },
            ChannelValue::Rgbww {
                red,
                green,
                blue,
                cold_white,
                warm_white,
            } => match white {
                WhiteChannels::None => red.max(green).max(blue).max(cold_white).max(warm_white),
                _ => 1.0,
            },
        }
    }
}

fn decode_mono(bytes: &[u8]) -> ChannelValue {
    ChannelValue::Mono {
        brightness: normalize(bytes[0]),
    }
}

fn decode_rgb(bytes: &[u8]) -> ChannelValue {
    ChannelValue::Rgb {
        red: normalize(bytes[0]),
        green: normalize(bytes[1]),
        blue: normalize(bytes[2]),
    }
}

fn decode_rgbw(bytes: &[u8]) -> ChannelValue {
    ChannelValue::Rgbw {
        red: normalize(bytes[0]),
        green: normalize(bytes[1]),
        blue: normalize(bytes[2]),
        white: normalize(bytes[3]),
    }
}

fn decode_rgbww(bytes: &[u8]) -> ChannelValue {
    ChannelValue::Rgbww {
        red: normalize(bytes[0]),
        green: normalize(bytes[1]),
        blue: normalize(bytes[2]),
        cold_white: normalize(bytes[3]),
        warm_white: normalize(bytes[4]),
    }
}

/// Decode one fixture/pixel from the front of `bytes`.
///
/// Returns `None` when fewer than `channel_type.width()` bytes are available.
/// When `gamma` is set every byte is mapped through it before normalization.
pub fn decode_channel(
    channel_type: ChannelType,
    bytes: &[u8],
    gamma: Option<&GammaTable>,
) -> Option<ChannelValue> {
    let width = channel_type.width();
    let raw = bytes.get(..width)?;
    let mut buf = [0u8; MAX_CHANNEL_WIDTH];
    for (dst, src) in buf.iter_mut().zip(raw) {
        *dst = match gamma {
            Some(table) => table.apply(*src),
            None => *src,
        };
    }
    Some((channel_type.decoder())(&buf[..width]))
}

/// Decode consecutive pixels, stopping at
/// `min(pixel_count, bytes.len() / width)`.
pub fn decode_pixels<'a>(
    channel_type: ChannelType,
    bytes: &'a [u8],
    pixel_count: usize,
    gamma: Option<&'a GammaTable>,
) -> impl Iterator<Item = ChannelValue> + 'a {
    bytes
        .chunks_exact(channel_type.width())
        .take(pixel_count)
        .filter_map(move |chunk| decode_channel(channel_type, chunk, gamma))
}
