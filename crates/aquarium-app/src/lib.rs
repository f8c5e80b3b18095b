//! Shared application plumbing for the aquarium terminal shell.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use aquarium_core::{SelectionChannel, SelectionToken};
use tracing::info;

pub mod command;
pub mod feed;
pub mod terminal;

pub use command::{
    EventDrain, EventReceiver, EventSender, EventSubmit, HostEvent, create_event_bus,
    drain_pending_events, make_event_drain, make_event_submit,
};
pub use feed::{DatasetWatcher, DemoFeed, load_dataset};

const SELECTION_LOG_CAPACITY: usize = 16;

/// Selection channel that logs broadcasts and keeps the most recent ones for display.
#[derive(Debug, Clone, Default)]
pub struct SelectionLog {
    entries: Arc<Mutex<VecDeque<String>>>,
}

impl SelectionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recent broadcasts, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn push(&self, entry: String) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.len() == SELECTION_LOG_CAPACITY {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
    }
}

impl SelectionChannel for SelectionLog {
    fn select(&mut self, token: &SelectionToken) {
        info!(token = token.as_str(), "broadcasting selection");
        self.push(format!("select {}", token.as_str()));
    }

    fn clear(&mut self) {
        info!("broadcasting selection clear");
        self.push("clear".to_string());
    }
}
