// Tone curves for the grayscale path, baked into a 256-entry table.
// Visual: gamma > 1 darkens mid-tones (LEDs look less washed out),
// gamma < 1 lifts them.

#[derive(Clone)]
pub struct ToneLut {
    table: [u8; 256],
}

impl ToneLut {
    /// Build a table from any 0..255 → 0..255 mapping.
    pub fn from_fn(f: impl Fn(u8) -> u8) -> Self {
        let mut table = [0u8; 256];
        for (v, slot) in table.iter_mut().enumerate() {
            *slot = f(v as u8);
        }
        Self { table }
    }

    /// `out = 255 × (in / 255)^gamma`. Non-positive or NaN gamma is identity.
    pub fn gamma(gamma: f64) -> Self {
        if !(gamma > 0.0) || !gamma.is_finite() {
            return Self::from_fn(|v| v);
        }
        Self::from_fn(|v| {
            let c = v as f64 / 255.0;
            (c.powf(gamma) * 255.0).round().clamp(0.0, 255.0) as u8
        })
    }

    #[inline]
    pub fn apply(&self, v: u8) -> u8 {
        self.table[v as usize]
    }
}
