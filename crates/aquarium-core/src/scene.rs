//! The aquarium orchestrator: lifecycle, dataset updates, ticks and pointer routing.

use rand::rngs::SmallRng;
use tracing::{debug, info, warn};

use crate::config::{AquariumConfig, ConfigError};
use crate::dataset::DatasetView;
use crate::decoration::Decorations;
use crate::driver::AnimationDriver;
use crate::host::{
    ColorPalette, DecorationSprite, FishSprite, FormatTooltipBuilder, NullSelectionChannel,
    SceneSink, SelectionChannel, StaticPalette, TooltipBuilder,
};
use crate::motion::MotionRules;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::registry::{Fish, FishId, FishRegistry, RetireHook, SpawnRegion};
use crate::scaling::{ViewScale, Viewport};
use crate::selection::{SelectionChange, SelectionController};
use crate::Tick;

/// Host collaborators the aquarium talks to.
pub struct HostServices {
    pub palette: Box<dyn ColorPalette + Send>,
    pub tooltips: Box<dyn TooltipBuilder + Send>,
    pub selection: Box<dyn SelectionChannel + Send>,
}

impl Default for HostServices {
    fn default() -> Self {
        Self {
            palette: Box::new(StaticPalette::default()),
            tooltips: Box::new(FormatTooltipBuilder),
            selection: Box::new(NullSelectionChannel),
        }
    }
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices").finish_non_exhaustive()
    }
}

/// Pointer interaction already resolved to a fish (or the background) by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    /// `None` is a click on the background.
    Click(Option<FishId>),
    HoverIn(FishId),
    HoverOut(FishId),
}

/// Clears selection and releases the visual handle for every retired fish.
struct Retirement<'a> {
    selection: &'a mut SelectionController,
    sink: &'a mut dyn SceneSink,
}

impl RetireHook for Retirement<'_> {
    fn fish_retired(&mut self, id: FishId, fish: &Fish) {
        self.selection.on_retired(id);
        self.sink.release_fish(id);
        debug!(key = %fish.key(), "fish retired");
    }
}

/// Owns every piece of scene state.
///
/// All entry points take `&mut self`, so dataset updates, ticks and pointer
/// events are serialised by construction.
#[derive(Debug)]
pub struct Aquarium {
    config: AquariumConfig,
    rules: MotionRules,
    registry: FishRegistry,
    decorations: Decorations,
    selection: SelectionController,
    driver: AnimationDriver,
    rng: SmallRng,
    viewport: Option<Viewport>,
    services: HostServices,
    destroyed: bool,
}

impl Aquarium {
    /// Validates `config` and lays out the decorations.
    pub fn new(config: AquariumConfig, services: HostServices) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = config.seeded_rng();
        let decorations = Decorations::seed(&config, &mut rng);
        Ok(Self {
            rules: MotionRules::from_config(&config),
            registry: FishRegistry::new(SpawnRegion::from_config(&config)),
            selection: SelectionController::new(config.faded_opacity),
            driver: AnimationDriver::new(),
            viewport: None,
            destroyed: false,
            config,
            decorations,
            rng,
            services,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AquariumConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &FishRegistry {
        &self.registry
    }

    #[must_use]
    pub fn decorations(&self) -> &Decorations {
        &self.decorations
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    #[must_use]
    pub fn driver(&self) -> &AnimationDriver {
        &self.driver
    }

    #[must_use]
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Starts the animation and paints the initial scene.
    pub fn init(&mut self, sink: &mut dyn SceneSink) -> bool {
        if self.destroyed {
            return false;
        }
        let started = self.driver.start();
        if started {
            info!(
                decorations = self.decorations.len(),
                seed = ?self.config.rng_seed,
                "aquarium initialised"
            );
        }
        self.repaint(sink);
        started
    }

    /// Applies a dataset snapshot and viewport, then repaints.
    pub fn update(
        &mut self,
        dataset: Option<&DatasetView>,
        viewport: Option<Viewport>,
        sink: &mut dyn SceneSink,
    ) -> ReconcileReport {
        if self.destroyed {
            warn!("dataset update after destroy ignored");
            return ReconcileReport::default();
        }
        self.viewport = viewport;

        let reconciler = Reconciler {
            config: &self.config,
            palette: self.services.palette.as_ref(),
            tooltips: self.services.tooltips.as_ref(),
        };
        let mut hook = Retirement {
            selection: &mut self.selection,
            sink: &mut *sink,
        };
        let report = reconciler.run(
            dataset,
            &mut self.registry,
            &mut self.decorations,
            &mut self.rng,
            &mut hook,
        );
        self.repaint(sink);
        report
    }

    /// Records a new viewport without touching the data.
    pub fn resize(&mut self, viewport: Option<Viewport>, sink: &mut dyn SceneSink) {
        if self.destroyed {
            return;
        }
        self.viewport = viewport;
        self.repaint(sink);
    }

    /// Runs one animation step. Returns `None` unless the driver is running.
    pub fn tick(&mut self, sink: &mut dyn SceneSink) -> Option<Tick> {
        let tick = self.driver.advance()?;
        self.rules
            .advance_all(&mut self.registry, self.selection.selected());
        self.repaint(sink);
        Some(tick)
    }

    /// Routes a pointer event and repaints when the selection changed.
    pub fn pointer(&mut self, event: PointerEvent, sink: &mut dyn SceneSink) -> SelectionChange {
        if self.destroyed {
            return SelectionChange::Unchanged;
        }
        let change = match event {
            PointerEvent::Click(Some(id)) => match self.registry.get(id) {
                Some(fish) => {
                    let token = fish.selection_token.clone();
                    self.selection
                        .click_fish(id, &token, self.services.selection.as_mut())
                }
                None => {
                    debug!(?id, "click on a retired fish ignored");
                    SelectionChange::Unchanged
                }
            },
            PointerEvent::Click(None) => self
                .selection
                .click_background(self.services.selection.as_mut()),
            PointerEvent::HoverIn(id) => {
                self.set_paused(id, true);
                SelectionChange::Unchanged
            }
            PointerEvent::HoverOut(id) => {
                self.set_paused(id, false);
                SelectionChange::Unchanged
            }
        };
        if change != SelectionChange::Unchanged {
            self.repaint(sink);
        }
        change
    }

    fn set_paused(&mut self, id: FishId, paused: bool) {
        if let Some(fish) = self.registry.get_mut(id) {
            fish.paused = paused;
        }
    }

    /// Paints decorations then fish at the current viewport scale.
    ///
    /// Returns `false` without touching the sink when the viewport is missing
    /// or has no area.
    pub fn repaint(&self, sink: &mut dyn SceneSink) -> bool {
        let Some(scale) = ViewScale::new(
            self.viewport,
            self.config.canvas_width,
            self.config.canvas_height,
        ) else {
            return false;
        };
        sink.begin_frame(scale.viewport);

        for (index, decoration) in self.decorations.iter() {
            if !decoration.is_visible() {
                continue;
            }
            let (x, y) = scale.to_physical(decoration.position);
            if x == 0.0 || y == 0.0 || !x.is_finite() || !y.is_finite() {
                continue;
            }
            sink.draw_decoration(&DecorationSprite {
                index,
                kind: decoration.kind,
                x,
                y,
                scale: scale.scale_size(decoration.size),
            });
        }

        for (id, fish) in self.registry.iter() {
            let (x, y) = scale.to_physical(fish.position);
            sink.draw_fish(&FishSprite {
                id,
                shape: fish.shape,
                x,
                y,
                scale: scale.scale_size(self.capped_size(fish.size)),
                mirrored: fish.is_mirrored(),
                color: fish.color,
                opacity: self.selection.opacity_for(id),
                tooltip: &fish.tooltip,
            });
        }

        sink.end_frame();
        true
    }

    fn capped_size(&self, size: f32) -> f32 {
        match self.config.max_size {
            Some(max) => size.clamp(-max, max),
            None => size,
        }
    }

    /// Stops the animation, then retires every fish. Safe to call repeatedly.
    pub fn destroy(&mut self, sink: &mut dyn SceneSink) -> bool {
        if self.destroyed {
            return false;
        }
        self.driver.stop();
        let mut hook = Retirement {
            selection: &mut self.selection,
            sink,
        };
        let retired = self.registry.retire_all(&mut hook);
        self.destroyed = true;
        info!(retired, "aquarium destroyed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::SeriesColumn;
    use crate::driver::DriverState;

    #[derive(Default)]
    struct Recording {
        frames: usize,
        fish: Vec<(FishId, f32, f32, bool)>,
        decorations: usize,
        released: Vec<FishId>,
    }

    impl SceneSink for Recording {
        fn begin_frame(&mut self, _viewport: Viewport) {
            self.frames += 1;
            self.fish.clear();
            self.decorations = 0;
        }

        fn draw_decoration(&mut self, _sprite: &DecorationSprite) {
            self.decorations += 1;
        }

        fn draw_fish(&mut self, sprite: &FishSprite<'_>) {
            self.fish
                .push((sprite.id, sprite.scale, sprite.opacity, sprite.mirrored));
        }

        fn release_fish(&mut self, id: FishId) {
            self.released.push(id);
        }
    }

    fn aquarium() -> Aquarium {
        let config = AquariumConfig {
            rng_seed: Some(42),
            ..AquariumConfig::default()
        };
        Aquarium::new(config, HostServices::default()).expect("valid config")
    }

    fn view(values: &[f64]) -> DatasetView {
        let labels = (0..values.len()).map(|i| format!("row{i}")).collect();
        DatasetView::from_columns(
            labels,
            vec![SeriesColumn::new(values.iter().copied().map(Some).collect())],
        )
    }

    #[test]
    fn rejects_invalid_config() {
        let config = AquariumConfig {
            faded_opacity: 2.0,
            ..AquariumConfig::default()
        };
        assert!(Aquarium::new(config, HostServices::default()).is_err());
    }

    #[test]
    fn init_starts_driver_once_and_ticks_move_fish() {
        let mut aquarium = aquarium();
        let mut sink = Recording::default();
        assert_eq!(aquarium.tick(&mut sink), None);
        assert!(aquarium.init(&mut sink));
        assert!(!aquarium.init(&mut sink));
        assert_eq!(aquarium.driver().state(), DriverState::Running);

        aquarium.update(
            Some(&view(&[4.0, 8.0])),
            Some(Viewport::new(500.0, 500.0)),
            &mut sink,
        );
        let before: Vec<f32> = aquarium.registry().iter().map(|(_, f)| f.position.x).collect();
        assert_eq!(aquarium.tick(&mut sink), Some(Tick(1)));
        let after: Vec<f32> = aquarium.registry().iter().map(|(_, f)| f.position.x).collect();
        assert_ne!(before, after);
        assert_eq!(sink.fish.len(), 2);
        // 50 pebbles and the first reed; the second series is absent so its reed has size 0.
        assert_eq!(sink.decorations, 51);
        assert_eq!(aquarium.decorations().reed_sizes()[1], 0.0);
    }

    #[test]
    fn selection_fades_others_and_freezes_selected() {
        let mut aquarium = aquarium();
        let mut sink = Recording::default();
        aquarium.init(&mut sink);
        aquarium.update(
            Some(&view(&[4.0, 8.0])),
            Some(Viewport::new(1_000.0, 1_000.0)),
            &mut sink,
        );
        let ids: Vec<FishId> = aquarium.registry().iter().map(|(id, _)| id).collect();

        let change = aquarium.pointer(PointerEvent::Click(Some(ids[0])), &mut sink);
        assert_eq!(change, SelectionChange::Selected(ids[0]));
        let frozen = aquarium.registry().get(ids[0]).expect("fish").position;
        aquarium.tick(&mut sink);
        assert_eq!(aquarium.registry().get(ids[0]).expect("fish").position, frozen);

        let opacities: Vec<f32> = sink.fish.iter().map(|(_, _, opacity, _)| *opacity).collect();
        assert_eq!(opacities, vec![1.0, 0.5]);

        let change = aquarium.pointer(PointerEvent::Click(None), &mut sink);
        assert_eq!(change, SelectionChange::Cleared);
        assert!(sink.fish.iter().all(|(_, _, opacity, _)| *opacity == 1.0));
    }

    #[test]
    fn hover_pauses_until_pointer_leaves() {
        let mut aquarium = aquarium();
        let mut sink = Recording::default();
        aquarium.init(&mut sink);
        aquarium.update(
            Some(&view(&[5.0])),
            Some(Viewport::new(1_000.0, 1_000.0)),
            &mut sink,
        );
        let id = aquarium.registry().iter().map(|(id, _)| id).next().expect("fish");

        aquarium.pointer(PointerEvent::HoverIn(id), &mut sink);
        let held = aquarium.registry().get(id).expect("fish").position;
        aquarium.tick(&mut sink);
        aquarium.tick(&mut sink);
        assert_eq!(aquarium.registry().get(id).expect("fish").position, held);

        aquarium.pointer(PointerEvent::HoverOut(id), &mut sink);
        aquarium.tick(&mut sink);
        assert_ne!(aquarium.registry().get(id).expect("fish").position, held);
    }

    #[test]
    fn retiring_selected_fish_releases_handle_and_clears_selection() {
        let mut aquarium = aquarium();
        let mut sink = Recording::default();
        aquarium.init(&mut sink);
        aquarium.update(
            Some(&view(&[4.0, 8.0])),
            Some(Viewport::new(1_000.0, 1_000.0)),
            &mut sink,
        );
        let first = aquarium.registry().iter().map(|(id, _)| id).next().expect("fish");
        aquarium.pointer(PointerEvent::Click(Some(first)), &mut sink);

        let shrunk = DatasetView::from_columns(
            vec!["row0".into(), "row1".into()],
            vec![SeriesColumn::new(vec![None, Some(8.0)])],
        );
        let report = aquarium.update(
            Some(&shrunk),
            Some(Viewport::new(1_000.0, 1_000.0)),
            &mut sink,
        );
        assert_eq!(report.retired.len(), 1);
        assert_eq!(sink.released, vec![first]);
        assert_eq!(aquarium.selection().selected(), None);
        assert_eq!(
            aquarium.pointer(PointerEvent::Click(Some(first)), &mut sink),
            SelectionChange::Unchanged
        );
    }

    #[test]
    fn max_size_caps_rendered_scale() {
        let config = AquariumConfig {
            rng_seed: Some(1),
            max_size: Some(0.1),
            ..AquariumConfig::default()
        };
        let mut aquarium = Aquarium::new(config, HostServices::default()).expect("valid");
        let mut sink = Recording::default();
        aquarium.update(
            Some(&view(&[10.0, -10.0])),
            Some(Viewport::new(500.0, 500.0)),
            &mut sink,
        );
        let scales: Vec<f32> = sink.fish.iter().map(|(_, scale, _, _)| *scale).collect();
        assert_eq!(scales, vec![0.05, -0.05]);
    }

    #[test]
    fn destroy_is_idempotent_and_final() {
        let mut aquarium = aquarium();
        let mut sink = Recording::default();
        aquarium.init(&mut sink);
        aquarium.update(
            Some(&view(&[1.0, 2.0, 3.0])),
            Some(Viewport::new(1_000.0, 1_000.0)),
            &mut sink,
        );

        assert!(aquarium.destroy(&mut sink));
        assert!(!aquarium.destroy(&mut sink));
        assert_eq!(sink.released.len(), 3);
        assert!(aquarium.registry().is_empty());
        assert_eq!(aquarium.driver().state(), DriverState::Stopped);
        assert_eq!(aquarium.tick(&mut sink), None);
        assert_eq!(
            aquarium.update(Some(&view(&[1.0])), None, &mut sink),
            ReconcileReport::default()
        );
        assert!(aquarium.registry().is_empty());
    }
}
