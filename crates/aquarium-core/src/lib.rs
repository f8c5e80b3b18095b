//! Core types and state machines for the aquarium visual.
//!
//! The crate owns the logic half of the visual: mapping a categorical dataset
//! onto long-lived fish, advancing their motion every tick, and tracking the
//! single selection. Drawing, palettes, tooltips and cross-visual selection
//! are reached through the traits in [`host`].

use serde::{Deserialize, Serialize};

pub mod config;
pub mod dataset;
pub mod decoration;
pub mod driver;
pub mod host;
pub mod motion;
pub mod reconcile;
pub mod registry;
pub mod scaling;
pub mod scene;
pub mod selection;

pub use config::{AquariumConfig, ConfigError};
pub use dataset::{CategoryColumn, DatasetView, SelectionToken, SeriesColumn};
pub use decoration::{Decoration, DecorationKind, Decorations};
pub use driver::{AnimationDriver, DriverState};
pub use host::{
    Color, ColorPalette, DecorationSprite, FishSprite, FormatTooltipBuilder, NullSelectionChannel,
    SceneSink, SelectionChannel, StaticPalette, Tooltip, TooltipBuilder, TooltipItem,
};
pub use motion::MotionRules;
pub use reconcile::{ReconcileReport, Reconciler, SeriesStats};
pub use registry::{Fish, FishAttributes, FishId, FishKey, FishRegistry, FishShape, RetireHook};
pub use scaling::{ViewScale, Viewport};
pub use scene::{Aquarium, HostServices, PointerEvent};
pub use selection::{SelectionChange, SelectionController};

/// Number of series columns the visual consumes; extra columns are ignored.
pub const MAX_SERIES: usize = 2;

/// Animation clock (ticks processed since the driver started).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Resets the tick counter back to zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// Point in the logical canvas.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Construct a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_advances_sequentially() {
        let tick = Tick::zero().next().next();
        assert_eq!(tick, Tick(2));
        assert_eq!(Tick::zero(), Tick(0));
    }
}
