//! Source image accessor and the display view.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use projection::Projection;

/// Reference image the contours are traced from.
pub trait SourceImage: Send + Sync {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// Row-major intensities, `width * height` long, or `None` when the
    /// image has no pixel data loaded.
    fn pixels(&self) -> Option<Arc<[f32]>>;

    /// Native projection of the image pixels.
    fn projection(&self) -> Arc<dyn Projection>;
}

/// In-memory source image.
#[derive(Clone)]
pub struct RasterImage {
    width: usize,
    height: usize,
    pixels: Option<Arc<[f32]>>,
    projection: Arc<dyn Projection>,
}

impl RasterImage {
    pub fn new(
        width: usize,
        height: usize,
        pixels: Vec<f32>,
        projection: Arc<dyn Projection>,
    ) -> Self {
        Self {
            width,
            height,
            pixels: Some(pixels.into()),
            projection,
        }
    }

    /// An image whose pixels have not been loaded.
    pub fn without_pixels(width: usize, height: usize, projection: Arc<dyn Projection>) -> Self {
        Self {
            width,
            height,
            pixels: None,
            projection,
        }
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("loaded", &self.pixels.is_some())
            .finish()
    }
}

impl SourceImage for RasterImage {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn pixels(&self) -> Option<Arc<[f32]>> {
        self.pixels.clone()
    }

    fn projection(&self) -> Arc<dyn Projection> {
        Arc::clone(&self.projection)
    }
}

/// The view contours are displayed in.
///
/// The user may switch the view's reference image at any time, including
/// while a computation is running; the projector reads the projection at
/// the moment it converts points.
#[derive(Debug)]
pub struct ViewState {
    projection: RwLock<Arc<dyn Projection>>,
}

impl ViewState {
    pub fn new(projection: Arc<dyn Projection>) -> Self {
        Self {
            projection: RwLock::new(projection),
        }
    }

    pub fn projection(&self) -> Arc<dyn Projection> {
        Arc::clone(&self.projection.read())
    }

    pub fn set_projection(&self, projection: Arc<dyn Projection>) {
        *self.projection.write() = projection;
    }
}
