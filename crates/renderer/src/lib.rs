//! Default collaborators for the contour engine.
//!
//! - [`contour::MarchingSquaresTracer`]: traces iso-intensity boundaries
//!   (marching squares) into sentinel-separated polylines
//! - [`canvas::CanvasSink`]: keeps drawable segments per level and
//!   rasterizes the visible ones with tiny-skia

pub mod canvas;
pub mod contour;

pub use canvas::{CanvasSink, RenderError};
pub use contour::{march_squares, MarchingSquaresTracer};
