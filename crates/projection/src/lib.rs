//! Astrometric projections between image pixels and the sky.
//!
//! Implements the projections from scratch without external WCS libraries.
//! The contour engine only needs the narrow [`Projection`] surface:
//! native pixel to sky, sky to pixel, and an identity check so that the
//! sky round-trip can be skipped when source and view share a projection.

pub mod sky;
pub mod tangent;

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use contour_common::Point;
use thiserror::Error;

pub use sky::SkyCoord;
pub use tangent::TangentProjection;

/// Errors from pixel/sky conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// The point lies on the hemisphere the projection cannot represent.
    #[error("({ra:.4}, {dec:.4}) is not visible in this projection")]
    NotVisible { ra: f64, dec: f64 },

    /// A pixel or sky coordinate was NaN or infinite.
    #[error("non-finite coordinate")]
    NonFinite,

    /// The linear part of the projection cannot be inverted.
    #[error("singular pixel scale matrix")]
    Singular,
}

/// Conversion between pixel coordinates of one image and the sky.
pub trait Projection: Send + Sync + Debug {
    fn pixel_to_sky(&self, pixel: Point) -> Result<SkyCoord, ProjectionError>;

    fn sky_to_pixel(&self, sky: SkyCoord) -> Result<Point, ProjectionError>;

    /// Whether `other` maps every pixel to the same sky position.
    fn same_as(&self, other: &dyn Projection) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// Identity check between two shared projections.
///
/// Pointer equality is tried first; otherwise the projections compare their
/// parameters.
pub fn is_same_projection(a: &Arc<dyn Projection>, b: &Arc<dyn Projection>) -> bool {
    Arc::ptr_eq(a, b) || a.same_as(b.as_ref())
}

/// Convert a native pixel of `from` into a pixel of `to` through the sky.
pub fn reproject(
    pixel: Point,
    from: &dyn Projection,
    to: &dyn Projection,
) -> Result<Point, ProjectionError> {
    let sky = from.pixel_to_sky(pixel)?;
    to.sky_to_pixel(sky)
}
