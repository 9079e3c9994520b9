use eframe::egui::Color32;
use palette::{Mix, Srgb};

// ---------------------------------------------------------------------------
// Diverging colour scale
// ---------------------------------------------------------------------------

/// ColorBrewer RdBu, reversed: blue for cold anomalies, red for warm.
const RDBU_R: [(u8, u8, u8); 11] = [
    (0x05, 0x30, 0x61),
    (0x21, 0x66, 0xac),
    (0x43, 0x93, 0xc3),
    (0x92, 0xc5, 0xde),
    (0xd1, 0xe5, 0xf0),
    (0xf7, 0xf7, 0xf7),
    (0xfd, 0xdb, 0xc7),
    (0xf4, 0xa5, 0x82),
    (0xd6, 0x60, 0x4d),
    (0xb2, 0x18, 0x2b),
    (0x67, 0x00, 0x1f),
];

/// Maps anomaly values onto the reversed RdBu scale with a two-slope
/// normalization: `-limit` → 0, `0` → 0.5, `+limit` → 1.
///
/// Stops are interpolated in sRGB space, like matplotlib's segmented maps.
#[derive(Debug, Clone)]
pub struct DivergingColorMap {
    limit: f32,
    stops: Vec<Srgb>,
    /// Colour for missing (NaN) cells.
    pub missing: [u8; 4],
}

impl DivergingColorMap {
    pub fn new(limit: f32) -> Self {
        let stops = RDBU_R
            .iter()
            .map(|&(r, g, b)| Srgb::new(r, g, b).into_format::<f32>())
            .collect();
        Self {
            limit: limit.abs().max(f32::EPSILON),
            stops,
            missing: [0, 0, 0, 0],
        }
    }

    pub fn limit(&self) -> f32 {
        self.limit
    }

    /// Position of `value` on the scale in `[0, 1]`, values beyond the limit
    /// saturate.
    pub fn normalize(&self, value: f32) -> f32 {
        (0.5 + 0.5 * value / self.limit).clamp(0.0, 1.0)
    }

    /// Unmultiplied RGBA for `value`; NaN maps to [`Self::missing`].
    pub fn rgba(&self, value: f32) -> [u8; 4] {
        if value.is_nan() {
            return self.missing;
        }
        let (r, g, b) = self.sample(self.normalize(value));
        [r, g, b, 255]
    }

    pub fn color32(&self, value: f32) -> Color32 {
        let [r, g, b, a] = self.rgba(value);
        Color32::from_rgba_unmultiplied(r, g, b, a)
    }

    fn sample(&self, t: f32) -> (u8, u8, u8) {
        let scaled = t * (self.stops.len() - 1) as f32;
        let lower = (scaled.floor() as usize).min(self.stops.len() - 2);
        let frac = scaled - lower as f32;
        let mixed = self.stops[lower].mix(self.stops[lower + 1], frac);
        let rgb: Srgb<u8> = mixed.into_format();
        (rgb.red, rgb.green, rgb.blue)
    }

    /// Evenly spaced tick values across `[-limit, limit]` for the colour bar.
    pub fn ticks(&self, count: usize) -> Vec<f32> {
        if count < 2 {
            return vec![0.0];
        }
        (0..count)
            .map(|i| -self.limit + 2.0 * self.limit * i as f32 / (count - 1) as f32)
            .collect()
    }
}
