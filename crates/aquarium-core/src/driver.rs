//! Lifecycle of the recurring animation tick.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Tick;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DriverState {
    #[default]
    Idle,
    Running,
    Stopped,
}

/// Gatekeeper for the animation clock.
///
/// The driver starts at most once and never restarts after stopping, so a
/// torn-down scene cannot be animated again by a late tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimationDriver {
    state: DriverState,
    tick: Tick,
}

impl AnimationDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == DriverState::Running
    }

    /// Ticks taken since the driver started.
    #[must_use]
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Moves `Idle` to `Running`; returns whether the state changed.
    pub fn start(&mut self) -> bool {
        if self.state != DriverState::Idle {
            return false;
        }
        self.state = DriverState::Running;
        info!("animation driver started");
        true
    }

    /// Stops the driver; repeated calls are no-ops that return `false`.
    pub fn stop(&mut self) -> bool {
        if self.state == DriverState::Stopped {
            return false;
        }
        self.state = DriverState::Stopped;
        info!(ticks = self.tick.0, "animation driver stopped");
        true
    }

    /// Claims the next tick, or `None` while idle or stopped.
    pub fn advance(&mut self) -> Option<Tick> {
        if self.state != DriverState::Running {
            debug!(state = ?self.state, "tick ignored");
            return None;
        }
        self.tick = self.tick.next();
        Some(self.tick)
    }
}
