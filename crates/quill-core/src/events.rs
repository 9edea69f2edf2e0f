//! Change notifications for the presentation layer

use quill_slice::{SliceId, SliceState};
use tokio::sync::broadcast;

/// Something observable changed in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// Slices appended, in document order
    SlicesInserted { ids: Vec<SliceId> },
    /// Slice deleted
    SliceRemoved { id: SliceId },
    /// Slice moved to a new state
    SliceStateChanged { id: SliceId, state: SliceState },
    /// Slice accepted new text
    SliceCommitted { id: SliceId, text: String },
    /// Document-level extension started (loading indicator on)
    ExtendStarted,
    /// Document-level extension ended, whatever the outcome (indicator off)
    ExtendFinished,
}

/// Broadcast sender shared by the document and orchestrator
#[derive(Debug, Clone)]
pub struct EventSender {
    inner: broadcast::Sender<DocumentEvent>,
}

impl EventSender {
    /// Create sender with per-subscriber buffer capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (inner, _) = broadcast::channel(capacity.max(1));
        Self { inner }
    }

    /// Publish an event; dropped silently when nobody listens
    pub fn emit(&self, event: DocumentEvent) {
        let _ = self.inner.send(event);
    }

    /// Subscribe to future events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.inner.subscribe()
    }
}

impl Default for EventSender {
    fn default() -> Self {
        Self::new(64)
    }
}
