//! Per-tick motion rules.

use crate::config::AquariumConfig;
use crate::registry::{Fish, FishId, FishRegistry};

/// Motion parameters lifted out of the configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionRules {
    pub left_boundary: f32,
    pub right_boundary: f32,
    pub float_step: f32,
    pub float_ceiling: f32,
}

impl MotionRules {
    #[must_use]
    pub fn from_config(config: &AquariumConfig) -> Self {
        Self {
            left_boundary: config.inner_margin,
            right_boundary: config.right_boundary(),
            float_step: config.float_step,
            float_ceiling: config.float_ceiling,
        }
    }

    /// Advances one fish by one tick. Returns whether it moved.
    ///
    /// Selected and paused fish hold still. Negative-size fish rise until they
    /// reach the ceiling. Crossing a side boundary turns the fish back inward,
    /// which is the only place the heading changes.
    pub fn advance(&self, fish: &mut Fish, selected: bool) -> bool {
        if selected || fish.paused {
            return false;
        }
        if fish.size < 0.0 && fish.position.y > self.float_ceiling {
            fish.position.y -= self.float_step;
        }
        fish.position.x -= fish.speed;
        if fish.position.x < self.left_boundary {
            fish.speed = -fish.speed.abs();
        } else if fish.position.x > self.right_boundary {
            fish.speed = fish.speed.abs();
        }
        true
    }

    /// Advances every fish except `selected`, returning how many moved.
    pub fn advance_all(&self, registry: &mut FishRegistry, selected: Option<FishId>) -> usize {
        let mut moved = 0;
        for (id, fish) in registry.iter_mut() {
            if self.advance(fish, Some(id) == selected) {
                moved += 1;
            }
        }
        moved
    }
}

impl Default for MotionRules {
    fn default() -> Self {
        Self::from_config(&AquariumConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::SelectionToken;
    use crate::host::{Color, Tooltip};
    use crate::registry::{FishAttributes, FishKey, FishShape, SpawnRegion};
    use crate::Position;
    use rand::{SeedableRng, rngs::SmallRng};

    fn spawn(registry: &mut FishRegistry, size: f32, speed: f32) -> FishId {
        let mut rng = SmallRng::seed_from_u64(registry.len() as u64);
        let key = FishKey::derive("A", 0, registry.len());
        registry
            .upsert(
                key,
                FishAttributes {
                    size,
                    speed_magnitude: speed,
                    color: Color::default(),
                    tooltip: Tooltip::default(),
                    shape: FishShape::Round,
                    selection_token: SelectionToken::new("A"),
                },
                &mut rng,
            )
            .id
    }

    fn registry() -> FishRegistry {
        FishRegistry::new(SpawnRegion::from_config(&AquariumConfig::default()))
    }

    #[test]
    fn positive_speed_swims_left() {
        let rules = MotionRules::default();
        let mut registry = registry();
        let id = spawn(&mut registry, 0.3, 2.0);
        let fish = registry.get_mut(id).expect("fish");
        fish.position = Position::new(500.0, 300.0);
        assert!(rules.advance(fish, false));
        assert_eq!(fish.position, Position::new(498.0, 300.0));
        assert_eq!(fish.speed, 2.0);
    }

    #[test]
    fn crossing_left_boundary_turns_right() {
        let rules = MotionRules::default();
        let mut registry = registry();
        let id = spawn(&mut registry, 0.3, 1.0);
        let fish = registry.get_mut(id).expect("fish");
        fish.position = Position::new(80.5, 300.0);
        rules.advance(fish, false);
        assert_eq!(fish.position.x, 79.5);
        assert_eq!(fish.speed, -1.0);
        assert!(!fish.is_mirrored());
        rules.advance(fish, false);
        assert_eq!(fish.position.x, 80.5);
        assert_eq!(fish.speed, -1.0);
    }

    #[test]
    fn crossing_right_boundary_turns_left() {
        let rules = MotionRules::default();
        let mut registry = registry();
        let id = spawn(&mut registry, 0.3, 1.0);
        let fish = registry.get_mut(id).expect("fish");
        fish.speed = -1.0;
        fish.position = Position::new(919.5, 300.0);
        rules.advance(fish, false);
        assert_eq!(fish.position.x, 920.5);
        assert_eq!(fish.speed, 1.0);
        assert!(fish.is_mirrored());
    }

    #[test]
    fn fish_outside_band_heading_inward_keeps_heading() {
        let rules = MotionRules::default();
        let mut registry = registry();
        let id = spawn(&mut registry, 0.3, 1.0);
        let fish = registry.get_mut(id).expect("fish");
        fish.speed = -1.0;
        fish.position = Position::new(60.0, 300.0);
        rules.advance(fish, false);
        assert_eq!(fish.position.x, 61.0);
        assert_eq!(fish.speed, -1.0);

        fish.speed = 1.0;
        fish.position = Position::new(950.0, 300.0);
        rules.advance(fish, false);
        assert_eq!(fish.position.x, 949.0);
        assert_eq!(fish.speed, 1.0);
    }

    #[test]
    fn negative_size_floats_up_to_ceiling() {
        let rules = MotionRules::default();
        let mut registry = registry();
        let id = spawn(&mut registry, -0.1, 0.0);
        let fish = registry.get_mut(id).expect("fish");
        fish.position = Position::new(500.0, 41.0);
        rules.advance(fish, false);
        assert_eq!(fish.position.y, 40.5);
        rules.advance(fish, false);
        assert_eq!(fish.position.y, 40.0);
        rules.advance(fish, false);
        assert_eq!(fish.position.y, 40.0);
    }

    #[test]
    fn paused_and_selected_fish_hold_still() {
        let rules = MotionRules::default();
        let mut registry = registry();
        let selected = spawn(&mut registry, 0.3, 1.0);
        let paused = spawn(&mut registry, 0.3, 1.0);
        let free = spawn(&mut registry, 0.3, 1.0);
        registry.get_mut(paused).expect("fish").paused = true;
        let before: Vec<Position> = registry.iter().map(|(_, f)| f.position).collect();

        assert_eq!(rules.advance_all(&mut registry, Some(selected)), 1);
        let after: Vec<Position> = registry.iter().map(|(_, f)| f.position).collect();
        assert_eq!(before[0], after[0]);
        assert_eq!(before[1], after[1]);
        assert_ne!(before[2], after[2]);
        assert!(registry.contains(free));
    }
}
