//! Bridges the core's paint stream onto a [`Surface`].

use aquarium_core::{DecorationSprite, FishId, FishSprite, SceneSink, Viewport};
use slotmap::SecondaryMap;
use tracing::trace;

use crate::Surface;

/// Owns the visual handle of every painted fish.
///
/// Handles are created the first time a fish is drawn and removed from the
/// surface as soon as the core reports the fish retired.
pub struct VisualAdapter<S: Surface> {
    surface: S,
    handles: SecondaryMap<FishId, S::Handle>,
    painted: Vec<FishId>,
    viewport: Option<Viewport>,
    frames: u64,
}

impl<S: Surface> VisualAdapter<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            handles: SecondaryMap::new(),
            painted: Vec::new(),
            viewport: None,
            frames: 0,
        }
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Number of live visual handles.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn has_handle(&self, id: FishId) -> bool {
        self.handles.contains_key(id)
    }

    /// Frames presented so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Viewport of the last painted frame.
    #[must_use]
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Topmost fish under a physical point in the last painted frame.
    #[must_use]
    pub fn hit_test(&self, point: (f32, f32)) -> Option<FishId> {
        self.painted.iter().rev().copied().find(|id| {
            self.handles
                .get(*id)
                .and_then(|handle| self.surface.fish_bounds(*handle))
                .is_some_and(|bounds| bounds.contains(point))
        })
    }
}

impl<S: Surface> SceneSink for VisualAdapter<S> {
    fn begin_frame(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        self.painted.clear();
        self.surface.begin_frame(viewport);
    }

    fn draw_decoration(&mut self, sprite: &DecorationSprite) {
        self.surface.draw_decoration(sprite);
    }

    fn draw_fish(&mut self, sprite: &FishSprite<'_>) {
        let handle = match self.handles.get(sprite.id) {
            Some(handle) => *handle,
            None => {
                let handle = self.surface.create_fish(sprite.shape);
                self.handles.insert(sprite.id, handle);
                trace!(id = ?sprite.id, "created fish handle");
                handle
            }
        };
        self.surface.update_fish(handle, sprite);
        self.painted.push(sprite.id);
    }

    fn release_fish(&mut self, id: FishId) {
        if let Some(handle) = self.handles.remove(id) {
            self.surface.remove_fish(handle);
            trace!(?id, "released fish handle");
        }
        self.painted.retain(|painted| *painted != id);
    }

    fn end_frame(&mut self) {
        self.surface.present();
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bounds;
    use aquarium_core::{Color, FishShape, Tooltip};
    use slotmap::SlotMap;

    #[derive(Default)]
    struct MockSurface {
        next: u32,
        live: Vec<(u32, Bounds)>,
        created: usize,
        removed: Vec<u32>,
    }

    impl Surface for MockSurface {
        type Handle = u32;

        fn begin_frame(&mut self, _viewport: Viewport) {}

        fn draw_decoration(&mut self, _sprite: &DecorationSprite) {}

        fn create_fish(&mut self, _shape: FishShape) -> u32 {
            self.next += 1;
            self.created += 1;
            self.live.push((self.next, Bounds::default()));
            self.next
        }

        fn update_fish(&mut self, handle: u32, sprite: &FishSprite<'_>) {
            if let Some((_, bounds)) = self.live.iter_mut().find(|(h, _)| *h == handle) {
                *bounds = Bounds {
                    x: sprite.x - 5.0,
                    y: sprite.y - 5.0,
                    width: 10.0,
                    height: 10.0,
                };
            }
        }

        fn remove_fish(&mut self, handle: u32) {
            self.live.retain(|(h, _)| *h != handle);
            self.removed.push(handle);
        }

        fn fish_bounds(&self, handle: u32) -> Option<Bounds> {
            self.live.iter().find(|(h, _)| *h == handle).map(|(_, b)| *b)
        }
    }

    fn sprite(id: FishId, x: f32, tooltip: &Tooltip) -> FishSprite<'_> {
        FishSprite {
            id,
            shape: FishShape::Round,
            x,
            y: 50.0,
            scale: 0.3,
            mirrored: false,
            color: Color::rgb(0, 0, 0),
            opacity: 1.0,
            tooltip,
        }
    }

    #[test]
    fn handles_are_created_once_and_released() {
        let mut ids: SlotMap<FishId, ()> = SlotMap::with_key();
        let (a, b) = (ids.insert(()), ids.insert(()));
        let tooltip = Tooltip::default();
        let mut adapter = VisualAdapter::new(MockSurface::default());

        for _ in 0..3 {
            adapter.begin_frame(Viewport::new(100.0, 100.0));
            adapter.draw_fish(&sprite(a, 20.0, &tooltip));
            adapter.draw_fish(&sprite(b, 24.0, &tooltip));
            adapter.end_frame();
        }
        assert_eq!(adapter.surface().created, 2);
        assert_eq!(adapter.handle_count(), 2);
        assert_eq!(adapter.frames(), 3);

        adapter.release_fish(a);
        adapter.release_fish(a);
        assert_eq!(adapter.surface().removed.len(), 1);
        assert!(!adapter.has_handle(a));
        assert!(adapter.has_handle(b));
    }

    #[test]
    fn hit_test_prefers_topmost_and_skips_released() {
        let mut ids: SlotMap<FishId, ()> = SlotMap::with_key();
        let (a, b) = (ids.insert(()), ids.insert(()));
        let tooltip = Tooltip::default();
        let mut adapter = VisualAdapter::new(MockSurface::default());
        adapter.begin_frame(Viewport::new(100.0, 100.0));
        adapter.draw_fish(&sprite(a, 20.0, &tooltip));
        adapter.draw_fish(&sprite(b, 24.0, &tooltip));
        adapter.end_frame();

        assert_eq!(adapter.hit_test((22.0, 50.0)), Some(b));
        assert_eq!(adapter.hit_test((16.0, 50.0)), Some(a));
        assert_eq!(adapter.hit_test((80.0, 80.0)), None);

        adapter.release_fish(b);
        assert_eq!(adapter.hit_test((22.0, 50.0)), Some(a));
    }
}
