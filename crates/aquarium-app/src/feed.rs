//! Dataset sources: JSON files (optionally watched for changes) and a demo feed.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use aquarium_core::{CategoryColumn, DatasetView, SelectionToken, SeriesColumn};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use tracing::{debug, info, warn};

use crate::command::{EventSubmit, HostEvent};

const WATCH_INTERVAL: Duration = Duration::from_millis(500);
const DEMO_SPECIES: &[&str] = &[
    "Cod", "Eel", "Pike", "Carp", "Tuna", "Perch", "Trout", "Bass", "Sole", "Hake", "Ling",
    "Shad", "Dace", "Rudd", "Ruffe", "Tench",
];

/// Reads a dataset snapshot from a JSON file.
pub fn load_dataset(path: &Path) -> Result<DatasetView> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    DatasetView::from_json_str(&raw)
        .with_context(|| format!("failed to parse dataset {}", path.display()))
}

/// Background thread that resubmits a dataset file whenever it changes.
pub struct DatasetWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DatasetWatcher {
    pub fn spawn(path: PathBuf, submit: EventSubmit) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("aquarium-dataset-watch".to_string())
            .spawn(move || watch_loop(&path, &submit, &flag))
            .context("failed to spawn dataset watcher")?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("dataset watcher panicked");
        }
    }
}

impl Drop for DatasetWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

fn watch_loop(path: &Path, submit: &EventSubmit, stop: &AtomicBool) {
    let mut last_seen = modified_at(path);
    info!(path = %path.display(), "watching dataset file");
    while !stop.load(Ordering::Relaxed) {
        thread::sleep(WATCH_INTERVAL);
        let modified = modified_at(path);
        if modified.is_none() || modified == last_seen {
            continue;
        }
        last_seen = modified;
        match load_dataset(path) {
            Ok(view) => {
                debug!(path = %path.display(), "dataset file changed");
                submit(HostEvent::Dataset(Some(view)));
            }
            Err(err) => warn!(error = %format!("{err:#}"), "ignoring unreadable dataset file"),
        }
    }
}

/// Synthetic dataset that drifts a little on every refresh.
///
/// Each refresh nudges every value, occasionally blanks a cell so its fish is
/// retired, and keeps a few values negative so some fish float to the top.
#[derive(Debug)]
pub struct DemoFeed {
    rng: SmallRng,
    labels: Vec<String>,
    values: [Vec<f64>; 2],
    refreshes: u64,
}

impl DemoFeed {
    #[must_use]
    pub fn new(rows: usize, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let labels = (0..rows)
            .map(|row| {
                let species = DEMO_SPECIES[row % DEMO_SPECIES.len()];
                match row / DEMO_SPECIES.len() {
                    0 => species.to_string(),
                    n => format!("{species} {}", n + 1),
                }
            })
            .collect();
        let mut series = || -> Vec<f64> {
            (0..rows)
                .map(|_| rng.random_range(-20.0..100.0))
                .collect()
        };
        let values = [series(), series()];
        Self {
            rng,
            labels,
            values,
            refreshes: 0,
        }
    }

    /// Number of snapshots produced so far.
    #[must_use]
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    /// Produces the next snapshot.
    pub fn next_snapshot(&mut self) -> DatasetView {
        if self.refreshes > 0 {
            for column in &mut self.values {
                for value in column.iter_mut() {
                    *value = (*value + self.rng.random_range(-15.0..15.0)).clamp(-40.0, 120.0);
                }
            }
        }
        self.refreshes += 1;

        let series = self
            .values
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let values = column
                    .iter()
                    .map(|value| (self.rng.random::<f32>() >= 0.1).then_some(value.round()))
                    .collect();
                SeriesColumn {
                    name: Some(if idx == 0 { "Weight" } else { "Length" }.to_string()),
                    values,
                }
            })
            .collect();

        DatasetView {
            categories: Some(CategoryColumn {
                identities: self.labels.iter().cloned().map(SelectionToken::new).collect(),
                labels: self.labels.clone(),
            }),
            series: Some(series),
        }
    }
}
