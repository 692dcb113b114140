//! Output interface consumed by receivers.
//!
//! A sink is whatever the host framework renders to: a single fixture or an
//! addressable strip. Strips expose themselves through
//! [`LightSink::as_addressable`], which a receiver checks once when it is
//! created.

use crate::decode::Color;
pub use crate::decode::WhiteChannels;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SinkCapabilities {
    pub white: WhiteChannels,
}

pub trait LightSink {
    fn capabilities(&self) -> SinkCapabilities {
        SinkCapabilities::default()
    }

    /// Set the color of a non-addressable output.
    fn set_color(&mut self, color: Color);

    fn set_brightness(&mut self, value: f32);

    /// Push pending changes to the hardware.
    fn flush(&mut self);

    /// State the output held before a receiver took control of it.
    fn external_state(&self) -> Color;

    /// Hand the output back to whatever controlled it before.
    fn restore_external_state(&mut self, color: Color);

    fn as_addressable(&mut self) -> Option<&mut dyn AddressableSink> {
        None
    }
}

pub trait AddressableSink {
    fn pixel_count(&self) -> usize;

    fn set_pixel(&mut self, index: usize, color: Color);
}

/// Sink that keeps the last written state in memory.
///
/// Used for headless runs and replays where only the final state matters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySink {
    white: WhiteChannels,
    color: Color,
    brightness: f32,
    pixels: Option<Vec<Color>>,
    external: Color,
    flushes: u64,
    restores: u64,
}

impl MemorySink {
    pub fn fixture(white: WhiteChannels) -> Self {
        Self {
            white,
            ..Self::default()
        }
    }

    pub fn strip(pixel_count: usize, white: WhiteChannels) -> Self {
        Self {
            white,
            pixels: Some(vec![Color::BLACK; pixel_count]),
            ..Self::default()
        }
    }

    /// State reported to a receiver as the pre-existing output.
    pub fn with_external_state(mut self, color: Color) -> Self {
        self.external = color;
        self.color = color;
        self
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn pixels(&self) -> Option<&[Color]> {
        self.pixels.as_deref()
    }

    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    pub fn restores(&self) -> u64 {
        self.restores
    }
}

impl LightSink for MemorySink {
    fn capabilities(&self) -> SinkCapabilities {
        SinkCapabilities { white: self.white }
    }

    fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    fn set_brightness(&mut self, value: f32) {
        self.brightness = value.clamp(0.0, 1.0);
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }

    fn external_state(&self) -> Color {
        self.external
    }

    fn restore_external_state(&mut self, color: Color) {
        self.restores += 1;
        self.color = color;
        self.brightness = color.max_component();
        if let Some(pixels) = self.pixels.as_mut() {
            pixels.fill(color);
        }
    }

    fn as_addressable(&mut self) -> Option<&mut dyn AddressableSink> {
        if self.pixels.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl AddressableSink for MemorySink {
    fn pixel_count(&self) -> usize {
        self.pixels.as_ref().map_or(0, Vec::len)
    }

    fn set_pixel(&mut self, index: usize, color: Color) {
        if let Some(pixel) = self.pixels.as_mut().and_then(|p| p.get_mut(index)) {
            *pixel = color;
        }
    }
}
