//! RGBA colors and per-level brightness variants.

use serde::{Deserialize, Serialize};

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse "#RRGGBB" or "#RRGGBBAA".
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim_start_matches('#');
        let channel = |i: usize| u8::from_str_radix(s.get(i..i + 2)?, 16).ok();

        match s.len() {
            6 => Some(Self::opaque(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    /// Parse a hex string or one of a handful of color names.
    pub fn parse(s: &str) -> Option<Self> {
        if s.starts_with('#') {
            return Self::from_hex(s);
        }
        let rgb = match s.to_lowercase().as_str() {
            "black" => (0, 0, 0),
            "white" => (255, 255, 255),
            "red" => (255, 0, 0),
            "green" => (0, 255, 0),
            "blue" => (0, 0, 255),
            "yellow" => (255, 255, 0),
            "cyan" => (0, 255, 255),
            "magenta" => (255, 0, 255),
            "orange" => (255, 165, 0),
            "purple" => (128, 0, 128),
            "gray" | "grey" => (128, 128, 128),
            _ => return Self::from_hex(s),
        };
        Some(Self::opaque(rgb.0, rgb.1, rgb.2))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }

    /// Pack into a `u32` as `0xRRGGBBAA`.
    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes([self.r, self.g, self.b, self.a])
    }

    pub fn from_u32(v: u32) -> Self {
        let [r, g, b, a] = v.to_be_bytes();
        Self { r, g, b, a }
    }

    /// Scale brightness by `factor`.
    ///
    /// Factors below 1 darken towards black, factors above 1 blend towards
    /// white. Alpha is preserved.
    pub fn with_brightness(&self, factor: f64) -> Self {
        let adjust = |c: u8| -> u8 {
            let c = c as f64;
            let v = if factor <= 1.0 {
                c * factor.max(0.0)
            } else {
                c + (255.0 - c) * (factor - 1.0).min(1.0)
            };
            v.round().clamp(0.0, 255.0) as u8
        };
        Self::new(adjust(self.r), adjust(self.g), adjust(self.b), self.a)
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::opaque(0, 255, 0)
    }
}

/// Darkest and brightest factors used across a level set.
const MIN_BRIGHTNESS: f64 = 0.6;
const MAX_BRIGHTNESS: f64 = 1.4;

/// Derive one color per level from `base`, from darkest (first level) to
/// brightest (last level). A single level keeps the base color.
pub fn brightness_variants(base: Rgba, count: usize) -> Vec<Rgba> {
    if count <= 1 {
        return vec![base; count];
    }

    (0..count)
        .map(|i| {
            let t = i as f64 / (count - 1) as f64;
            base.with_brightness(MIN_BRIGHTNESS + t * (MAX_BRIGHTNESS - MIN_BRIGHTNESS))
        })
        .collect()
}
