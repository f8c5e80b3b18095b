use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use aquarium_app::{
    DatasetWatcher, DemoFeed, HostEvent, SelectionLog, create_event_bus, load_dataset,
    make_event_drain, make_event_submit,
    terminal::{TerminalContext, TerminalRenderer, host_services},
};
use aquarium_core::{Aquarium, AquariumConfig};
use clap::Parser;
use tracing::info;

const EVENT_QUEUE_CAPACITY: usize = 256;
const DEFAULT_DEMO_SEED: u64 = 0xF15E_CAFE;

#[derive(Parser, Debug)]
#[command(
    name = "aquarium",
    version,
    about = "Animated aquarium visual for two-series category datasets"
)]
struct Cli {
    /// JSON dataset to display; reloaded whenever the file changes.
    #[arg(long, env = "AQUARIUM_DATA", conflicts_with = "demo")]
    data: Option<PathBuf>,

    /// Drive the aquarium from a drifting synthetic dataset.
    #[arg(long)]
    demo: bool,

    /// JSON file overriding the default aquarium configuration.
    #[arg(long, env = "AQUARIUM_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for fish placement and the demo feed.
    #[arg(long, env = "AQUARIUM_SEED")]
    seed: Option<u64>,

    /// Number of categories in the demo feed.
    #[arg(long, default_value_t = 12)]
    rows: usize,

    /// Do not watch the dataset file for changes.
    #[arg(long)]
    no_watch: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    if cli.data.is_none() && !cli.demo {
        bail!("nothing to show: pass --data <file> or --demo");
    }

    let config = load_config(&cli)?;
    let selection_log = SelectionLog::new();
    let aquarium = Aquarium::new(config, host_services(&selection_log))
        .context("invalid aquarium configuration")?;

    let (sender, receiver) = create_event_bus(EVENT_QUEUE_CAPACITY);
    let submit = make_event_submit(sender);
    let drain = make_event_drain(receiver);

    let mut demo = None;
    let mut watcher = None;
    if let Some(path) = cli.data.as_ref() {
        let view = load_dataset(path)?;
        info!(path = %path.display(), rows = view.row_count(), "loaded dataset");
        submit(HostEvent::Dataset(Some(view)));
        if !cli.no_watch {
            watcher = Some(DatasetWatcher::spawn(path.clone(), submit.clone())?);
        }
    } else {
        let mut feed = DemoFeed::new(cli.rows, cli.seed.unwrap_or(DEFAULT_DEMO_SEED));
        submit(HostEvent::Dataset(Some(feed.next_snapshot())));
        demo = Some(feed);
    }

    info!("Starting aquarium terminal shell");
    let ctx = TerminalContext::new(aquarium, drain, submit, demo, selection_log);
    let result = TerminalRenderer::default().run(ctx);

    if let Some(mut watcher) = watcher {
        watcher.stop();
    }
    result
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<AquariumConfig> {
    let mut config = match cli.config.as_ref() {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            AquariumConfig::from_json_str(&raw)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => AquariumConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.rng_seed = Some(seed);
    }
    Ok(config)
}
