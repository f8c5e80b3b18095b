//! Static configuration for an aquarium scene.

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Position;

/// Errors raised while validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// The configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Static configuration for an aquarium scene.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AquariumConfig {
    /// Width of the logical canvas.
    pub canvas_width: f32,
    /// Height of the logical canvas.
    pub canvas_height: f32,
    /// Distance from the left/right edges at which fish turn around.
    pub inner_margin: f32,
    /// Horizontal extent of the spawn region, measured from `inner_margin`.
    pub spawn_width: f32,
    /// Vertical extent of the spawn region, measured from `inner_margin`.
    pub spawn_height: f32,
    /// Vertical distance a negative-size fish rises per tick.
    pub float_step: f32,
    /// Fish stop rising once `y` reaches this value.
    pub float_ceiling: f32,
    /// Multiplier converting a normalized value into a fish size.
    pub size_factor: f32,
    /// Multiplier converting a series share into a reed size.
    pub reed_scale: f32,
    /// Opacity of unselected fish while a selection is active.
    pub faded_opacity: f32,
    /// Number of pebbles laid along the bottom.
    pub pebble_count: usize,
    /// Anchor points of the two data-driven reeds.
    pub reed_anchors: [Position; 2],
    /// Reed sizes shown before the first dataset arrives.
    pub initial_reed_sizes: [f32; 2],
    /// Optional RNG seed for reproducible scenes.
    pub rng_seed: Option<u64>,
    /// Use the triangle archetype for odd series; when false every fish is round.
    pub triangle_fish: bool,
    /// Optional cap on the rendered magnitude of a fish scale.
    pub max_size: Option<f32>,
    /// Format string handed to the tooltip builder.
    pub format_string: Option<String>,
}

impl Default for AquariumConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1_000.0,
            canvas_height: 1_000.0,
            inner_margin: 80.0,
            spawn_width: 840.0,
            spawn_height: 760.0,
            float_step: 0.5,
            float_ceiling: 40.0,
            size_factor: 0.3,
            reed_scale: 0.8,
            faded_opacity: 0.5,
            pebble_count: 50,
            reed_anchors: [Position::new(40.0, 1_000.0), Position::new(840.0, 1_000.0)],
            initial_reed_sizes: [0.4, 0.8],
            rng_seed: None,
            triangle_fish: true,
            max_size: None,
            format_string: None,
        }
    }
}

impl AquariumConfig {
    /// Parse a configuration document, falling back to defaults for missing fields.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration describes a usable scene.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.canvas_width > 0.0 && self.canvas_height > 0.0)
            || !self.canvas_width.is_finite()
            || !self.canvas_height.is_finite()
        {
            return Err(ConfigError::InvalidConfig(
                "canvas dimensions must be positive and finite",
            ));
        }
        if self.inner_margin < 0.0 || self.inner_margin * 2.0 >= self.canvas_width {
            return Err(ConfigError::InvalidConfig(
                "inner_margin must leave a swimmable band inside the canvas",
            ));
        }
        if self.spawn_width < 0.0
            || self.spawn_height < 0.0
            || self.inner_margin + self.spawn_width > self.canvas_width
            || self.inner_margin + self.spawn_height > self.canvas_height
        {
            return Err(ConfigError::InvalidConfig(
                "spawn region must fit inside the canvas",
            ));
        }
        if self.float_step < 0.0 || self.float_ceiling < 0.0 {
            return Err(ConfigError::InvalidConfig(
                "float_step and float_ceiling must be non-negative",
            ));
        }
        if self.size_factor <= 0.0 || self.reed_scale < 0.0 {
            return Err(ConfigError::InvalidConfig(
                "size_factor must be positive and reed_scale non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.faded_opacity) {
            return Err(ConfigError::InvalidConfig(
                "faded_opacity must be within [0, 1]",
            ));
        }
        if let Some(max) = self.max_size
            && (max.is_nan() || max <= 0.0)
        {
            return Err(ConfigError::InvalidConfig("max_size must be positive"));
        }
        Ok(())
    }

    /// Returns the configured RNG, seeding from entropy if no seed is set.
    pub(crate) fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }

    /// Right-hand turning boundary.
    #[must_use]
    pub fn right_boundary(&self) -> f32 {
        self.canvas_width - self.inner_margin
    }
}
