//! Rendering layer for the aquarium.
//!
//! [`VisualAdapter`] sits between the core's [`aquarium_core::SceneSink`]
//! stream and a retained-mode [`Surface`]. It owns one surface node per live
//! fish and answers hit tests against what was last painted.

use std::path::PathBuf;

use aquarium_core::{DecorationSprite, FishShape, FishSprite, Viewport};
use thiserror::Error;

pub mod adapter;
pub mod ascii;

pub use adapter::VisualAdapter;
pub use ascii::{AsciiSurface, Cell, CellKind, GlyphId};

/// Errors raised by surfaces.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A surface needs at least one row and one column.
    #[error("surface must have a non-zero size (got {cols}x{rows})")]
    EmptySurface { cols: u16, rows: u16 },
    /// Writing a text snapshot failed.
    #[error("failed to write snapshot to {path}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Axis-aligned rectangle in physical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    #[must_use]
    pub fn contains(&self, point: (f32, f32)) -> bool {
        point.0 >= self.x
            && point.0 < self.x + self.width
            && point.1 >= self.y
            && point.1 < self.y + self.height
    }
}

/// Retained-mode drawing target.
///
/// Fish are long-lived nodes addressed by [`Surface::Handle`]; decorations are
/// redrawn every frame.
pub trait Surface {
    type Handle: Copy;

    /// Starts a frame; `viewport` is the physical size of the canvas.
    fn begin_frame(&mut self, viewport: Viewport);

    fn draw_decoration(&mut self, sprite: &DecorationSprite);

    fn create_fish(&mut self, shape: FishShape) -> Self::Handle;

    fn update_fish(&mut self, handle: Self::Handle, sprite: &FishSprite<'_>);

    fn remove_fish(&mut self, handle: Self::Handle);

    /// Physical extent of a node as of its last update.
    fn fish_bounds(&self, handle: Self::Handle) -> Option<Bounds>;

    fn present(&mut self) {}
}
