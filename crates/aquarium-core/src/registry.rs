//! Owned storage for the fish, keyed by their data-derived identifier.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use crate::Position;
use crate::config::AquariumConfig;
use crate::dataset::SelectionToken;
use crate::host::{Color, Tooltip};

new_key_type! {
    /// Generational handle for a live fish.
    pub struct FishId;
}

/// Stable, data-derived fish identifier.
///
/// Two snapshots holding the same (label, series, row) cell derive the same
/// key, which is what lets a fish keep its position and heading across updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FishKey(String);

impl FishKey {
    #[must_use]
    pub fn derive(label: &str, series: usize, row: usize) -> Self {
        Self(format!("{label}, series {series}_{row}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FishKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FishKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Visual archetype of a fish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FishShape {
    #[default]
    Round,
    Triangle,
}

impl FishShape {
    /// Alternates archetypes by series so two measures stay distinguishable.
    #[must_use]
    pub fn for_series(series: usize, triangle_fish: bool) -> Self {
        if triangle_fish && series % 2 == 1 {
            Self::Triangle
        } else {
            Self::Round
        }
    }
}

/// Attributes derived from one dataset cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FishAttributes {
    pub size: f32,
    pub speed_magnitude: f32,
    pub color: Color,
    pub tooltip: Tooltip,
    pub shape: FishShape,
    pub selection_token: SelectionToken,
}

/// A live fish.
#[derive(Debug, Clone, PartialEq)]
pub struct Fish {
    key: FishKey,
    pub position: Position,
    /// Negative sizes make the fish float towards the surface.
    pub size: f32,
    /// Positive values swim left, negative values swim right.
    pub speed: f32,
    pub color: Color,
    pub shape: FishShape,
    pub tooltip: Tooltip,
    pub selection_token: SelectionToken,
    /// Set while the pointer hovers the fish.
    pub paused: bool,
}

impl Fish {
    fn spawn(key: FishKey, position: Position, attributes: FishAttributes) -> Self {
        let mut fish = Self {
            key,
            position,
            size: 0.0,
            speed: 0.0,
            color: attributes.color,
            shape: attributes.shape,
            tooltip: Tooltip::default(),
            selection_token: attributes.selection_token.clone(),
            paused: false,
        };
        fish.apply(attributes);
        fish
    }

    /// Copies data-driven attributes while keeping position, pause and heading.
    fn apply(&mut self, attributes: FishAttributes) {
        let heading = if self.speed < 0.0 { -1.0 } else { 1.0 };
        self.size = attributes.size;
        self.speed = attributes.speed_magnitude.abs() * heading;
        self.color = attributes.color;
        self.shape = attributes.shape;
        self.tooltip = attributes.tooltip;
        self.selection_token = attributes.selection_token;
    }

    #[must_use]
    pub fn key(&self) -> &FishKey {
        &self.key
    }

    /// Sprites face left; fish heading right are drawn mirrored.
    #[must_use]
    pub fn is_mirrored(&self) -> bool {
        self.speed > 0.0
    }
}

/// Receives retirement notifications so dependent state can be dropped.
pub trait RetireHook {
    fn fish_retired(&mut self, id: FishId, fish: &Fish);
}

impl RetireHook for () {
    fn fish_retired(&mut self, _id: FishId, _fish: &Fish) {}
}

/// Outcome of [`FishRegistry::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upserted {
    pub id: FishId,
    pub created: bool,
}

/// Rectangle new fish are dropped into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRegion {
    pub origin: Position,
    pub width: f32,
    pub height: f32,
}

impl SpawnRegion {
    #[must_use]
    pub fn from_config(config: &AquariumConfig) -> Self {
        Self {
            origin: Position::new(config.inner_margin, config.inner_margin),
            width: config.spawn_width,
            height: config.spawn_height,
        }
    }

    fn sample(&self, rng: &mut impl Rng) -> Position {
        let x = self.origin.x + rng.random::<f32>() * self.width;
        let y = self.origin.y + rng.random::<f32>() * self.height;
        Position::new(x, y)
    }

    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        position.x >= self.origin.x
            && position.x <= self.origin.x + self.width
            && position.y >= self.origin.y
            && position.y <= self.origin.y + self.height
    }
}

/// Mapping from [`FishKey`] to live fish.
#[derive(Debug)]
pub struct FishRegistry {
    slots: SlotMap<FishId, Fish>,
    index: HashMap<FishKey, FishId>,
    order: Vec<FishId>,
    spawn: SpawnRegion,
}

impl FishRegistry {
    #[must_use]
    pub fn new(spawn: SpawnRegion) -> Self {
        Self {
            slots: SlotMap::with_key(),
            index: HashMap::new(),
            order: Vec::new(),
            spawn,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn spawn_region(&self) -> SpawnRegion {
        self.spawn
    }

    /// Creates the fish for `key` or refreshes its data-driven attributes.
    pub fn upsert(
        &mut self,
        key: FishKey,
        attributes: FishAttributes,
        rng: &mut impl Rng,
    ) -> Upserted {
        if let Some(&id) = self.index.get(&key)
            && let Some(fish) = self.slots.get_mut(id)
        {
            fish.apply(attributes);
            return Upserted { id, created: false };
        }

        let fish = Fish::spawn(key.clone(), self.spawn.sample(rng), attributes);
        let id = self.slots.insert(fish);
        self.index.insert(key, id);
        self.order.push(id);
        Upserted { id, created: true }
    }

    /// Removes the fish for `key`, notifying `hook` before it is dropped.
    pub fn retire(&mut self, key: &str, hook: &mut dyn RetireHook) -> Option<Fish> {
        let fish = self.remove_entry(key, hook)?;
        self.compact_order();
        Some(fish)
    }

    /// Drops the fish for `key` without touching the creation order.
    fn remove_entry(&mut self, key: &str, hook: &mut dyn RetireHook) -> Option<Fish> {
        let id = self.index.remove(key)?;
        let fish = self.slots.remove(id)?;
        hook.fish_retired(id, &fish);
        Some(fish)
    }

    /// Forgets order entries whose fish is gone. One pass per batch.
    fn compact_order(&mut self) {
        let slots = &self.slots;
        self.order.retain(|id| slots.contains_key(*id));
    }

    /// Retires every fish whose key is not in `present`, returning the retired keys.
    pub fn retire_missing(
        &mut self,
        present: &HashSet<FishKey>,
        hook: &mut dyn RetireHook,
    ) -> Vec<FishKey> {
        let stale: Vec<FishKey> = self
            .index
            .keys()
            .filter(|key| !present.contains(*key))
            .cloned()
            .collect();
        for key in &stale {
            self.remove_entry(key.as_str(), hook);
        }
        if !stale.is_empty() {
            self.compact_order();
        }
        stale
    }

    /// Retires every fish.
    pub fn retire_all(&mut self, hook: &mut dyn RetireHook) -> usize {
        let keys = self.keys();
        for key in &keys {
            self.remove_entry(key.as_str(), hook);
        }
        self.order.clear();
        keys.len()
    }

    #[must_use]
    pub fn get(&self, id: FishId) -> Option<&Fish> {
        self.slots.get(id)
    }

    #[must_use]
    pub fn get_mut(&mut self, id: FishId) -> Option<&mut Fish> {
        self.slots.get_mut(id)
    }

    #[must_use]
    pub fn id_of(&self, key: &str) -> Option<FishId> {
        self.index.get(key).copied()
    }

    #[must_use]
    pub fn get_by_key(&self, key: &str) -> Option<&Fish> {
        self.id_of(key).and_then(|id| self.slots.get(id))
    }

    #[must_use]
    pub fn contains(&self, id: FishId) -> bool {
        self.slots.contains_key(id)
    }

    /// Snapshot of the live keys.
    #[must_use]
    pub fn keys(&self) -> Vec<FishKey> {
        self.index.keys().cloned().collect()
    }

    /// Live fish in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (FishId, &Fish)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.slots.get(*id).map(|fish| (*id, fish)))
    }

    /// Mutable access to every live fish, in no particular order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (FishId, &mut Fish)> + '_ {
        self.slots.iter_mut()
    }
}
