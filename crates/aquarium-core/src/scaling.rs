//! Mapping between the logical canvas and the physical viewport.

use serde::{Deserialize, Serialize};

use crate::Position;

/// Physical size of the area the host gives the visual.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Whether anything can be drawn into this viewport.
    #[must_use]
    pub fn is_drawable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

/// Per-axis scale factors from logical canvas units to physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewScale {
    pub scale_x: f32,
    pub scale_y: f32,
    pub viewport: Viewport,
}

impl ViewScale {
    /// Builds the scale for `viewport`; `None` when there is nothing to draw into.
    #[must_use]
    pub fn new(viewport: Option<Viewport>, canvas_width: f32, canvas_height: f32) -> Option<Self> {
        let viewport = viewport?;
        if !viewport.is_drawable() || canvas_width <= 0.0 || canvas_height <= 0.0 {
            return None;
        }
        Some(Self {
            scale_x: viewport.width / canvas_width,
            scale_y: viewport.height / canvas_height,
            viewport,
        })
    }

    #[inline]
    #[must_use]
    pub fn to_physical(&self, position: Position) -> (f32, f32) {
        (position.x * self.scale_x, position.y * self.scale_y)
    }

    /// Sprite sizes follow the horizontal scale so shapes keep their aspect.
    #[inline]
    #[must_use]
    pub fn scale_size(&self, size: f32) -> f32 {
        size * self.scale_x
    }

    /// Maps a physical point back into the logical canvas.
    #[must_use]
    pub fn to_logical(&self, point: (f32, f32)) -> Option<Position> {
        let x = point.0 / self.scale_x;
        let y = point.1 / self.scale_y;
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        Some(Position::new(x, y))
    }
}
