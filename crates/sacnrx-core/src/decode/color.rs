use serde::{Deserialize, Serialize};

/// Normalized color as handed to a light sink, every channel in `0.0..=1.0`.
///
/// `white` is the single white channel (or cold white on sinks with two white
/// channels); `warm_white` is only non-zero for two-white sinks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    #[serde(default)]
    pub white: f32,
    #[serde(default)]
    pub warm_white: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        red: 0.0,
        green: 0.0,
        blue: 0.0,
        white: 0.0,
        warm_white: 0.0,
    };

    pub fn rgb(red: f32, green: f32, blue: f32) -> Self {
        Self {
            red,
            green,
            blue,
            ..Self::BLACK
        }
    }

    pub fn gray(level: f32) -> Self {
        Self::rgb(level, level, level)
    }

    pub fn max_rgb(&self) -> f32 {
        self.red.max(self.green).max(self.blue)
    }

    pub fn max_component(&self) -> f32 {
        self.max_rgb().max(self.white).max(self.warm_white)
    }
}

/// White channel support of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhiteChannels {
    #[default]
    None,
    Single,
    ColdWarm,
}

pub(crate) fn normalize(value: u8) -> f32 {
    f32::from(value) / 255.0
}
