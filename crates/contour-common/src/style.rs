//! Per-level presentation flags shared between the engine and the renderer.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::color::Rgba;

/// Color and visibility of one contour level.
///
/// Every segment of a level refers to the same `Arc<LevelStyle>`, so a single
/// store changes the color or visibility of the whole level at once.
#[derive(Debug)]
pub struct LevelStyle {
    color: AtomicU32,
    visible: AtomicBool,
}

impl LevelStyle {
    pub fn new(color: Rgba, visible: bool) -> Self {
        Self {
            color: AtomicU32::new(color.to_u32()),
            visible: AtomicBool::new(visible),
        }
    }

    pub fn color(&self) -> Rgba {
        Rgba::from_u32(self.color.load(Ordering::Acquire))
    }

    pub fn set_color(&self, color: Rgba) {
        self.color.store(color.to_u32(), Ordering::Release);
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
    }
}

impl Default for LevelStyle {
    fn default() -> Self {
        Self::new(Rgba::default(), true)
    }
}
