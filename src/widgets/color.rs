//! RGB colour used by hook, node and progress-bar view-models.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Brighter colour: HSV value scaled by `factor` percent.
    ///
    /// When the value overflows, the excess is taken from the saturation,
    /// so saturated colours drift toward white. `factor < 100` darkens.
    pub fn lighter(self, factor: u32) -> Self {
        if factor == 0 {
            return self;
        }
        if factor < 100 {
            return self.darker(10_000 / factor);
        }
        let (h, s, v) = self.to_hsv();
        let mut s = s;
        let mut v = v * factor as f32 / 100.0;
        if v > 255.0 {
            s = (s - (v - 255.0)).max(0.0);
            v = 255.0;
        }
        Self::from_hsv(h, s, v)
    }

    /// Darker colour: HSV value divided by `factor` percent.
    pub fn darker(self, factor: u32) -> Self {
        if factor == 0 {
            return self;
        }
        let (h, s, v) = self.to_hsv();
        Self::from_hsv(h, s, v * 100.0 / factor as f32)
    }

    /// Hue in degrees (0..360), saturation and value in 0..=255.
    fn to_hsv(self) -> (f32, f32, f32) {
        let (r, g, b) = (self.r as f32, self.g as f32, self.b as f32);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        let s = if max > 0.0 { delta / max * 255.0 } else { 0.0 };
        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        (h, s, max)
    }

    fn from_hsv(h: f32, s: f32, v: f32) -> Self {
        let s = s / 255.0;
        let c = v * s;
        let hp = h / 60.0;
        let x = c * (1.0 - (hp.rem_euclid(2.0) - 1.0).abs());
        let (r, g, b) = match hp as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = v - c;
        let to_u8 = |f: f32| (f + m).round().clamp(0.0, 255.0) as u8;
        Self::rgb(to_u8(r), to_u8(g), to_u8(b))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
