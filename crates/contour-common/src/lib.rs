//! Common types shared across the isocontour workspace.
//!
//! The engine, the default tracing/rendering collaborators and the CLI all
//! agree on these value types and on the two collaborator traits
//! ([`ContourTracer`], [`SegmentSink`]) that sit at the engine boundary.

pub mod collaborator;
pub mod color;
pub mod error;
pub mod geometry;
pub mod style;

pub use collaborator::{ContourTracer, SegmentSink};
pub use color::{brightness_variants, Rgba};
pub use error::{ContourError, Result, TraceError};
pub use geometry::{sub_loops, PixelRect, Point, Polyline, Segment};
pub use style::LevelStyle;
