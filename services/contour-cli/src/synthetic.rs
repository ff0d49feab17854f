//! Synthetic star fields for running the pipeline without input data.

/// Deterministic field of Gaussian stars over a flat sky background.
pub fn star_field(width: usize, height: usize, stars: usize, seed: u32) -> Vec<f32> {
    let sources: Vec<(f64, f64, f64, f64)> = (0..stars as u32)
        .map(|i| {
            let x = (hash(i, 0, seed) % width.max(1) as u32) as f64;
            let y = (hash(i, 1, seed) % height.max(1) as u32) as f64;
            let h = hash(i, 2, seed);
            let peak = 50.0 + (h % 4000) as f64;
            let sigma = 1.2 + (h % 9) as f64 * 0.6;
            (x, y, peak, sigma)
        })
        .collect();

    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let (px, py) = (col as f64, row as f64);
            let mut value = 100.0 + (hash(col as u32, row as u32, seed) % 100) as f64 / 20.0;
            for &(x, y, peak, sigma) in &sources {
                let r2 = (px - x).powi(2) + (py - y).powi(2);
                if r2 < 100.0 * sigma * sigma {
                    value += peak * (-r2 / (2.0 * sigma * sigma)).exp();
                }
            }
            data.push(value as f32);
        }
    }
    data
}

fn hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed ^ 0x9e37_79b9;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_field_is_deterministic() {
        let a = star_field(64, 32, 10, 1);
        assert_eq!(a.len(), 64 * 32);
        assert_eq!(a, star_field(64, 32, 10, 1));
        assert!(a.iter().all(|v| *v >= 100.0));
    }
}
