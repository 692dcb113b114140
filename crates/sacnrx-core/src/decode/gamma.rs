pub const DEFAULT_GAMMA: f32 = 2.8;

/// 8-bit to 8-bit gamma lookup table.
#[derive(Clone, PartialEq, Eq)]
pub struct GammaTable {
    lut: [u8; 256],
}

impl GammaTable {
    pub fn new(gamma: f32) -> Self {
        let mut lut = [0u8; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            let normalized = i as f32 / 255.0;
            *slot = (normalized.powf(gamma) * 255.0 + 0.5).clamp(0.0, 255.0) as u8;
        }
        Self { lut }
    }

    pub fn apply(&self, value: u8) -> u8 {
        self.lut[usize::from(value)]
    }
}

impl Default for GammaTable {
    fn default() -> Self {
        Self::new(DEFAULT_GAMMA)
    }
}

impl std::fmt::Debug for GammaTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GammaTable")
            .field("mid", &self.lut[128])
            .finish_non_exhaustive()
    }
}
