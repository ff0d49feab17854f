//! Equatorial sky coordinates.

use serde::{Deserialize, Serialize};

/// A position on the celestial sphere, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyCoord {
    /// Right ascension in [0, 360)
    pub ra: f64,
    /// Declination in [-90, 90]
    pub dec: f64,
}

impl SkyCoord {
    /// Create a coordinate, wrapping RA into [0, 360).
    pub fn new(ra: f64, dec: f64) -> Self {
        Self {
            ra: ra.rem_euclid(360.0),
            dec,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.ra.is_finite() && self.dec.is_finite()
    }

    /// Great-circle distance to `other` in degrees (haversine).
    pub fn separation(&self, other: &SkyCoord) -> f64 {
        let (ra1, dec1) = (self.ra.to_radians(), self.dec.to_radians());
        let (ra2, dec2) = (other.ra.to_radians(), other.dec.to_radians());

        let sin_ddec = ((dec2 - dec1) / 2.0).sin();
        let sin_dra = ((ra2 - ra1) / 2.0).sin();
        let h = sin_ddec * sin_ddec + dec1.cos() * dec2.cos() * sin_dra * sin_dra;

        (2.0 * h.sqrt().min(1.0).asin()).to_degrees()
    }
}
