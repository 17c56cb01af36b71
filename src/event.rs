//! Notifications for the authoring UI
//!
//! The preview never calls into the UI. It queues plain-data events that the
//! UI drains after each interaction.

use crate::light::LightId;

/// Something the UI may want to react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent {
    /// The current light changed
    LightSelected(LightId),
    /// A layer's selection flag changed
    LayerSelected { index: usize, selected: bool },
    /// Light controls should be enabled (a light is being edited) or disabled
    LightControlsEnabled(bool),
}

/// FIFO of pending events
#[derive(Debug, Default, Clone)]
pub struct EventQueue {
    pending: Vec<EditorEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: EditorEvent) {
        self.pending.push(event);
    }

    /// Take all pending events, oldest first.
    pub fn drain(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
