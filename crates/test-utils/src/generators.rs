//! Synthetic image generators for creating astronomical-like test data.
//!
//! These generators create predictable, verifiable pixel patterns that can
//! be used across the test suite. All grids are row-major `Vec<f32>`, the
//! sample at column `x`, row `y` sitting at pixel coordinate `(x, y)`.

/// A point source on a synthetic image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    pub x: f64,
    pub y: f64,
    /// Peak intensity above the background.
    pub peak: f64,
    /// Gaussian width in pixels.
    pub sigma: f64,
}

impl Star {
    pub fn new(x: f64, y: f64, peak: f64, sigma: f64) -> Self {
        Self { x, y, peak, sigma }
    }

    /// Intensity contributed at pixel `(x, y)`.
    pub fn intensity(&self, x: f64, y: f64) -> f64 {
        let r2 = (x - self.x).powi(2) + (y - self.y).powi(2);
        self.peak * (-r2 / (2.0 * self.sigma * self.sigma)).exp()
    }

    /// Distance from the center at which the profile falls to `level`.
    ///
    /// Returns `None` when `level` is not strictly between 0 and the peak.
    pub fn radius_at(&self, level: f64) -> Option<f64> {
        if level <= 0.0 || level >= self.peak {
            return None;
        }
        Some(self.sigma * (2.0 * (self.peak / level).ln()).sqrt())
    }
}

/// Creates an image of Gaussian point sources over a flat background.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
/// * `background` - Constant sky level
/// * `stars` - Sources to add
///
/// # Example
///
/// ```
/// use test_utils::{starfield, Star};
///
/// let data = starfield(10, 10, 1.0, &[Star::new(5.0, 5.0, 100.0, 2.0)]);
/// assert_eq!(data.len(), 100);
/// assert_eq!(data[5 * 10 + 5], 101.0);
/// ```
pub fn starfield(width: usize, height: usize, background: f32, stars: &[Star]) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let (x, y) = (col as f64, row as f64);
            let flux: f64 = stars.iter().map(|s| s.intensity(x, y)).sum();
            data.push(background + flux as f32);
        }
    }
    data
}

/// Creates a single centered Gaussian peak with no background.
pub fn gaussian_peak(width: usize, height: usize, peak: f64, sigma: f64) -> Vec<f32> {
    let star = centered_star(width, height, peak, sigma);
    starfield(width, height, 0.0, &[star])
}

/// The star [`gaussian_peak`] draws.
pub fn centered_star(width: usize, height: usize, peak: f64, sigma: f64) -> Star {
    Star::new(width as f64 / 2.0, height as f64 / 2.0, peak, sigma)
}

/// Creates a deterministic pseudo-random starfield.
///
/// Uses a simple hash-based approach for reproducibility.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
/// * `count` - Number of stars
/// * `seed` - Seed value for deterministic generation
pub fn random_starfield(width: usize, height: usize, count: usize, seed: u32) -> Vec<f32> {
    let stars: Vec<Star> = (0..count as u32)
        .map(|i| {
            let hx = simple_hash(i, 0, seed);
            let hy = simple_hash(i, 1, seed);
            let hp = simple_hash(i, 2, seed);
            Star::new(
                (hx % width.max(1) as u32) as f64,
                (hy % height.max(1) as u32) as f64,
                50.0 + (hp % 950) as f64,
                1.5 + (hp % 7) as f64 * 0.5,
            )
        })
        .collect();

    starfield(width, height, 10.0, &stars)
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

/// Creates a horizontal ramp: each sample equals its column index.
pub fn ramp_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            data.push(col as f32);
        }
    }
    data
}

/// Creates a grid filled with a constant value.
pub fn constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Repeats every sample of a `width x height` image over a `k x k` block.
///
/// The result is `width*k x height*k`. Block-summing it by `k` gives back
/// the input scaled by `k²`.
///
/// # Example
///
/// ```
/// use test_utils::replicate_blocks;
///
/// let data = replicate_blocks(&[1.0, 2.0], 2, 1, 2);
/// assert_eq!(data, vec![1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 2.0, 2.0]);
/// ```
pub fn replicate_blocks(data: &[f32], width: usize, height: usize, k: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(data.len() * k * k);
    for row in 0..height * k {
        for col in 0..width * k {
            out.push(data[(row / k) * width + col / k]);
        }
    }
    out
}

/// Sets every sample inside the rectangle to NaN (blank pixels).
pub fn blank_region(data: &mut [f32], width: usize, x0: usize, y0: usize, w: usize, h: usize) {
    for row in y0..y0 + h {
        for col in x0..x0 + w {
            data[row * width + col] = f32::NAN;
        }
    }
}
