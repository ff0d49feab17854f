//! Gnomonic (TAN) projection.
//!
//! This is the projection used by most astronomical survey images. Sky
//! positions are projected onto the plane tangent to the celestial sphere at
//! the reference point, and a linear transform maps the plane to pixels.
//!
//! The projection parameters follow the FITS WCS keywords:
//! - Reference pixel (CRPIX1/2), here zero-based
//! - Reference sky position (CRVAL1/2) in degrees
//! - Linear transform (CD matrix) in degrees per pixel

use std::any::Any;

use contour_common::Point;
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use crate::sky::SkyCoord;
use crate::{Projection, ProjectionError};

/// Gnomonic projection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TangentProjection {
    /// Reference pixel (zero-based)
    pub crpix: (f64, f64),
    /// Reference sky position in degrees
    pub crval: SkyCoord,
    /// Pixel to intermediate world coordinates, degrees per pixel
    cd: Matrix2<f64>,
    /// Inverse of `cd`
    cd_inv: Matrix2<f64>,
}

impl TangentProjection {
    /// Create a projection from its WCS keywords.
    ///
    /// # Arguments
    /// * `crpix` - Reference pixel, zero-based (x, y)
    /// * `crval` - Sky position at the reference pixel
    /// * `cd` - CD matrix as `[[cd1_1, cd1_2], [cd2_1, cd2_2]]` in degrees/pixel
    pub fn new(
        crpix: (f64, f64),
        crval: SkyCoord,
        cd: [[f64; 2]; 2],
    ) -> Result<Self, ProjectionError> {
        let cd = Matrix2::new(cd[0][0], cd[0][1], cd[1][0], cd[1][1]);
        let cd_inv = cd.try_inverse().ok_or(ProjectionError::Singular)?;

        Ok(Self {
            crpix,
            crval,
            cd,
            cd_inv,
        })
    }

    /// North-up, east-left projection with square pixels.
    ///
    /// # Arguments
    /// * `crpix` - Reference pixel, zero-based (x, y)
    /// * `crval` - Sky position at the reference pixel
    /// * `scale_arcsec` - Pixel scale in arcseconds per pixel
    /// * `rotation_deg` - Position angle of the image y axis, east of north
    pub fn from_scale(
        crpix: (f64, f64),
        crval: SkyCoord,
        scale_arcsec: f64,
        rotation_deg: f64,
    ) -> Result<Self, ProjectionError> {
        let s = scale_arcsec / 3600.0;
        let (sin_r, cos_r) = rotation_deg.to_radians().sin_cos();
        Self::new(
            crpix,
            crval,
            [[-s * cos_r, s * sin_r], [s * sin_r, s * cos_r]],
        )
    }

    /// Pixel scale along each axis in arcseconds.
    pub fn pixel_scale_arcsec(&self) -> (f64, f64) {
        let sx = (self.cd[(0, 0)].powi(2) + self.cd[(1, 0)].powi(2)).sqrt();
        let sy = (self.cd[(0, 1)].powi(2) + self.cd[(1, 1)].powi(2)).sqrt();
        (sx * 3600.0, sy * 3600.0)
    }
}

impl Projection for TangentProjection {
    fn pixel_to_sky(&self, pixel: Point) -> Result<SkyCoord, ProjectionError> {
        if !pixel.is_finite() {
            return Err(ProjectionError::NonFinite);
        }

        // Standard coordinates on the tangent plane, radians
        let offset = Vector2::new(pixel.x - self.crpix.0, pixel.y - self.crpix.1);
        let world = self.cd * offset;
        let xi = world.x.to_radians();
        let eta = world.y.to_radians();

        let ra0 = self.crval.ra.to_radians();
        let (sin_dec0, cos_dec0) = self.crval.dec.to_radians().sin_cos();

        let denom = cos_dec0 - eta * sin_dec0;
        let ra = ra0 + xi.atan2(denom);
        let dec = (eta * cos_dec0 + sin_dec0).atan2((xi * xi + denom * denom).sqrt());

        Ok(SkyCoord::new(ra.to_degrees(), dec.to_degrees()))
    }

    fn sky_to_pixel(&self, sky: SkyCoord) -> Result<Point, ProjectionError> {
        if !sky.is_finite() {
            return Err(ProjectionError::NonFinite);
        }

        let dra = (sky.ra - self.crval.ra).to_radians();
        let (sin_dec, cos_dec) = sky.dec.to_radians().sin_cos();
        let (sin_dec0, cos_dec0) = self.crval.dec.to_radians().sin_cos();
        let (sin_dra, cos_dra) = dra.sin_cos();

        // Cosine of the angular distance from the tangent point
        let cos_c = sin_dec0 * sin_dec + cos_dec0 * cos_dec * cos_dra;
        if cos_c <= 1e-10 {
            return Err(ProjectionError::NotVisible {
                ra: sky.ra,
                dec: sky.dec,
            });
        }

        let xi = (cos_dec * sin_dra / cos_c).to_degrees();
        let eta = ((cos_dec0 * sin_dec - sin_dec0 * cos_dec * cos_dra) / cos_c).to_degrees();

        let offset = self.cd_inv * Vector2::new(xi, eta);
        Ok(Point::new(offset.x + self.crpix.0, offset.y + self.crpix.1))
    }

    fn same_as(&self, other: &dyn Projection) -> bool {
        other
            .as_any()
            .downcast_ref::<TangentProjection>()
            .is_some_and(|o| o == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
