//! Diff-based synchronisation of the fish registry against a dataset snapshot.

use std::collections::HashSet;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::AquariumConfig;
use crate::dataset::{DatasetView, SeriesColumn};
use crate::decoration::Decorations;
use crate::host::{ColorPalette, TooltipBuilder};
use crate::registry::{FishAttributes, FishKey, FishRegistry, FishShape, RetireHook};
use crate::MAX_SERIES;

/// Per-series maxima used to normalise values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    /// Largest valid cell per series, folded from zero; `None` when the series
    /// is missing or has no valid cells.
    pub series_max: [Option<f64>; MAX_SERIES],
    /// Largest series maximum, never below 1.
    pub overall_max: f64,
}

impl SeriesStats {
    #[must_use]
    pub fn compute(series: &[SeriesColumn]) -> Self {
        let mut series_max = [None; MAX_SERIES];
        let mut overall_max: f64 = 1.0;
        for (slot, column) in series_max.iter_mut().zip(series) {
            let max = column
                .values
                .iter()
                .enumerate()
                .filter_map(|(row, _)| column.value(row))
                .fold(None, |acc: Option<f64>, value| {
                    Some(acc.unwrap_or(0.0).max(value))
                });
            if let Some(max) = max {
                overall_max = overall_max.max(max);
            }
            *slot = max;
        }
        Self {
            series_max,
            overall_max,
        }
    }

    /// Reed heights relative to the tallest series; 0 hides a reed.
    #[must_use]
    pub fn reed_sizes(&self, reed_scale: f32) -> [f32; MAX_SERIES] {
        self.series_max.map(|max| match max {
            Some(max) if max > 0.0 => {
                let size = (max / self.overall_max) as f32 * reed_scale;
                if size.is_finite() { size } else { 0.0 }
            }
            _ => 0.0,
        })
    }
}

/// Counts produced by one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub retired: Vec<FishKey>,
    /// Cells with no usable value or no row label.
    pub skipped_cells: usize,
    /// The view was absent or malformed and the scene was emptied.
    pub emptied: bool,
    pub stats: Option<SeriesStats>,
}

/// Host collaborators and policy needed to turn cells into fish.
pub struct Reconciler<'a> {
    pub config: &'a AquariumConfig,
    pub palette: &'a dyn ColorPalette,
    pub tooltips: &'a dyn TooltipBuilder,
}

impl Reconciler<'_> {
    /// Synchronises `registry` and the reed sizes with `view`.
    ///
    /// Stale fish are retired through `hook` before this returns, so no later
    /// tick can observe them.
    pub fn run(
        &self,
        view: Option<&DatasetView>,
        registry: &mut FishRegistry,
        decorations: &mut Decorations,
        rng: &mut impl Rng,
        hook: &mut dyn RetireHook,
    ) -> ReconcileReport {
        let Some((view, (categories, series))) = view.and_then(|v| v.parts().map(|p| (v, p)))
        else {
            if view.is_some() {
                warn!(
                    fish = registry.len(),
                    "dataset view is missing categories or values; emptying aquarium"
                );
            }
            decorations.hide_reeds();
            let retired = registry.keys();
            registry.retire_all(hook);
            return ReconcileReport {
                retired,
                emptied: true,
                ..ReconcileReport::default()
            };
        };

        let stats = SeriesStats::compute(series);
        decorations.set_reed_sizes(stats.reed_sizes(self.config.reed_scale));

        let mut report = ReconcileReport {
            stats: Some(stats),
            ..ReconcileReport::default()
        };
        let mut present: HashSet<FishKey> = HashSet::new();
        let rows = view.row_count();
        let format = self.config.format_string.as_deref();

        for (series_idx, column) in series.iter().enumerate() {
            for row in 0..rows {
                let (Some(value), Some(label), Some(token)) = (
                    column.value(row),
                    categories.label(row),
                    categories.identity(row),
                ) else {
                    report.skipped_cells += 1;
                    continue;
                };

                let normalized = (value / stats.overall_max) as f32;
                let size = normalized * self.config.size_factor;
                let mut speed_magnitude = normalized.abs();
                if size < 0.0 {
                    speed_magnitude /= 2.0;
                }

                let key = FishKey::derive(label, series_idx, row);
                let attributes = FishAttributes {
                    size,
                    speed_magnitude,
                    color: self.palette.color_by_index(row),
                    tooltip: self
                        .tooltips
                        .build(format, view, label, value, series_idx, row),
                    shape: FishShape::for_series(series_idx, self.config.triangle_fish),
                    selection_token: token,
                };
                let outcome = registry.upsert(key.clone(), attributes, rng);
                if outcome.created {
                    report.created += 1;
                } else {
                    report.updated += 1;
                }
                present.insert(key);
            }
        }

        report.retired = registry.retire_missing(&present, hook);
        debug!(
            created = report.created,
            updated = report.updated,
            retired = report.retired.len(),
            skipped = report.skipped_cells,
            overall_max = stats.overall_max,
            "reconciled dataset snapshot"
        );
        report
    }
}
