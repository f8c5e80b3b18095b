//! Non-interactive background pieces: pebbles along the floor and two reeds
//! whose height tracks the series maxima.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::AquariumConfig;
use crate::{MAX_SERIES, Position};

const PEBBLE_SPACING: f32 = 20.0;
const PEBBLE_JITTER_X: f32 = 10.0;
const PEBBLE_ROW_OFFSET: f32 = 30.0;
const PEBBLE_BASELINE: f32 = 930.0;
const PEBBLE_JITTER_Y: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecorationKind {
    Pebble,
    Reed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decoration {
    pub position: Position,
    /// Zero (or any non-positive value) hides the decoration.
    pub size: f32,
    pub kind: DecorationKind,
}

impl Decoration {
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.size.is_finite() && self.size > 0.0
    }
}

/// Ordered decoration list; paint order is list order.
#[derive(Debug, Clone, Default)]
pub struct Decorations {
    items: Vec<Decoration>,
    reeds: [usize; MAX_SERIES],
}

impl Decorations {
    /// Lays pebbles across the floor in shuffled overlap order, then the reeds.
    pub fn seed(config: &AquariumConfig, rng: &mut impl Rng) -> Self {
        let mut items: Vec<Decoration> = Vec::with_capacity(config.pebble_count + MAX_SERIES);
        for i in 0..config.pebble_count {
            let jitter = rng.random::<f32>() * PEBBLE_JITTER_X - PEBBLE_JITTER_X / 2.0;
            let x = i as f32 * PEBBLE_SPACING + jitter;
            let y = (i % 2) as f32 * PEBBLE_ROW_OFFSET
                + PEBBLE_BASELINE
                + rng.random::<f32>() * PEBBLE_JITTER_Y;
            let at = rng.random_range(0..=items.len());
            items.insert(
                at,
                Decoration {
                    position: Position::new(x, y),
                    size: 1.0,
                    kind: DecorationKind::Pebble,
                },
            );
        }

        let mut reeds = [0; MAX_SERIES];
        for (slot, (anchor, size)) in reeds
            .iter_mut()
            .zip(config.reed_anchors.iter().zip(config.initial_reed_sizes))
        {
            *slot = items.len();
            items.push(Decoration {
                position: *anchor,
                size,
                kind: DecorationKind::Reed,
            });
        }

        Self { items, reeds }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Decoration)> + '_ {
        self.items.iter().enumerate()
    }

    /// Current reed sizes, one per consumed series.
    #[must_use]
    pub fn reed_sizes(&self) -> [f32; MAX_SERIES] {
        self.reeds.map(|idx| self.items.get(idx).map_or(0.0, |reed| reed.size))
    }

    pub fn set_reed_sizes(&mut self, sizes: [f32; MAX_SERIES]) {
        for (idx, size) in self.reeds.into_iter().zip(sizes) {
            if let Some(reed) = self.items.get_mut(idx) {
                reed.size = if size.is_finite() { size } else { 0.0 };
            }
        }
    }

    pub fn hide_reeds(&mut self) {
        self.set_reed_sizes([0.0; MAX_SERIES]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};

    #[test]
    fn seeds_pebbles_then_reeds() {
        let config = AquariumConfig::default();
        let mut rng = SmallRng::seed_from_u64(9);
        let decorations = Decorations::seed(&config, &mut rng);
        assert_eq!(decorations.len(), 52);

        let pebbles: Vec<&Decoration> = decorations
            .iter()
            .map(|(_, d)| d)
            .filter(|d| d.kind == DecorationKind::Pebble)
            .collect();
        assert_eq!(pebbles.len(), 50);
        for pebble in pebbles {
            assert!(pebble.position.x >= -5.0 && pebble.position.x <= 985.0);
            assert!(pebble.position.y >= 930.0 && pebble.position.y <= 1_000.0);
        }
        assert_eq!(decorations.reed_sizes(), [0.4, 0.8]);
    }

    #[test]
    fn reeds_can_shrink_to_invisible() {
        let config = AquariumConfig::default();
        let mut rng = SmallRng::seed_from_u64(10);
        let mut decorations = Decorations::seed(&config, &mut rng);
        decorations.set_reed_sizes([0.8, f32::NAN]);
        assert_eq!(decorations.reed_sizes(), [0.8, 0.0]);
        decorations.hide_reeds();
        let visible_reeds = decorations
            .iter()
            .filter(|(_, d)| d.kind == DecorationKind::Reed && d.is_visible())
            .count();
        assert_eq!(visible_reeds, 0);
    }
}
