//! Single-selection state machine.

use tracing::debug;

use crate::dataset::SelectionToken;
use crate::host::SelectionChannel;
use crate::registry::FishId;

/// What a pointer interaction did to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Selected(FishId),
    Cleared,
    /// The interaction left the selection untouched.
    Unchanged,
}

/// Tracks at most one selected fish.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionController {
    selected: Option<FishId>,
    faded_opacity: f32,
}

impl SelectionController {
    #[must_use]
    pub fn new(faded_opacity: f32) -> Self {
        Self {
            selected: None,
            faded_opacity,
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<FishId> {
        self.selected
    }

    #[must_use]
    pub fn is_selected(&self, id: FishId) -> bool {
        self.selected == Some(id)
    }

    /// Toggles `id`: clicking the selected fish clears, any other fish takes over.
    pub fn click_fish(
        &mut self,
        id: FishId,
        token: &SelectionToken,
        channel: &mut dyn SelectionChannel,
    ) -> SelectionChange {
        if self.selected == Some(id) {
            self.selected = None;
            channel.clear();
            debug!(?id, "fish deselected");
            SelectionChange::Cleared
        } else {
            self.selected = Some(id);
            channel.select(token);
            debug!(?id, token = token.as_str(), "fish selected");
            SelectionChange::Selected(id)
        }
    }

    /// Background clicks always clear, even with nothing selected.
    pub fn click_background(&mut self, channel: &mut dyn SelectionChannel) -> SelectionChange {
        self.selected = None;
        channel.clear();
        SelectionChange::Cleared
    }

    /// Drops the selection without notifying anyone when its fish is retired.
    pub fn on_retired(&mut self, id: FishId) -> SelectionChange {
        if self.selected == Some(id) {
            self.selected = None;
            debug!(?id, "selected fish retired");
            SelectionChange::Cleared
        } else {
            SelectionChange::Unchanged
        }
    }

    /// Render opacity for `id` under the current selection.
    #[must_use]
    pub fn opacity_for(&self, id: FishId) -> f32 {
        match self.selected {
            Some(selected) if selected != id => self.faded_opacity,
            _ => 1.0,
        }
    }
}
