//! Ordered collection of slices
//!
//! The document is the single owner of its slices. Every mutation goes
//! through a method here, completes before returning, and publishes a
//! [`DocumentEvent`] describing the change.

use crate::error::DocumentError;
use crate::events::{DocumentEvent, EventSender};
use indexmap::IndexMap;
use quill_slice::{
    PendingGeneration, RequestTicket, Slice, SliceAction, SliceId, SliceState, SliceView,
    TextCleaner,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Separator between slices in exported text
pub const SLICE_SEPARATOR: &str = "\n\n";

/// Serializable snapshot for presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Seed topic
    pub prompt: Option<String>,
    /// Slices in reading order
    pub slices: Vec<SliceView>,
}

/// A document under construction
#[derive(Debug)]
pub struct DocumentModel {
    prompt: Option<String>,
    slices: IndexMap<SliceId, Slice>,
    last_ticket: RequestTicket,
    events: EventSender,
}

impl DocumentModel {
    /// Create empty document
    #[must_use]
    pub fn new(prompt: Option<String>) -> Self {
        Self::with_events(prompt, EventSender::default())
    }

    /// Create empty document publishing to `events`
    #[must_use]
    pub fn with_events(prompt: Option<String>, events: EventSender) -> Self {
        Self {
            prompt,
            slices: IndexMap::new(),
            last_ticket: RequestTicket(0),
            events,
        }
    }

    /// Create document from seed paragraphs; blank ones are skipped
    #[must_use]
    pub fn from_paragraphs<I, S>(prompt: Option<String>, paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut document = Self::new(prompt);
        document.insert_slices(paragraphs);
        document
    }

    /// Seed topic
    #[inline]
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// Heading derived from the topic: `prefix` and `.` characters removed
    #[must_use]
    pub fn title(&self, prefix: &str) -> Option<String> {
        let prompt = self.prompt.as_deref()?.trim();
        let title = prompt.replacen(prefix, "", 1).replace('.', "");
        Some(title.trim().to_string())
    }

    /// Number of slices
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// Check if the document has no slices
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Look up a slice
    #[inline]
    #[must_use]
    pub fn get(&self, id: SliceId) -> Option<&Slice> {
        self.slices.get(&id)
    }

    /// Slices in reading order
    pub fn slices(&self) -> impl Iterator<Item = &Slice> {
        self.slices.values()
    }

    /// Slice ids in reading order
    #[must_use]
    pub fn ids(&self) -> Vec<SliceId> {
        self.slices.keys().copied().collect()
    }

    /// Presentation snapshot
    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            prompt: self.prompt.clone(),
            slices: self.slices.values().map(Slice::view).collect(),
        }
    }

    /// Subscribe to change events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.events.subscribe()
    }

    /// Sender this document publishes to
    #[inline]
    #[must_use]
    pub fn events(&self) -> &EventSender {
        &self.events
    }

    /// Prompt for the next document extension
    ///
    /// The last slice's accepted text, or the topic behind `prefix` and
    /// followed by a period when the document is empty.
    #[must_use]
    pub fn extension_seed(&self, prefix: &str) -> Option<String> {
        match self.slices.last() {
            Some((_, slice)) => Some(slice.current_text().to_string()),
            None => self.prompt.as_deref().map(|p| format!("{prefix}{p}.")),
        }
    }

    /// Append one slice per non-blank text, preserving order
    ///
    /// Returns the ids of the new slices.
    pub fn insert_slices<I, S>(&mut self, texts: I) -> Vec<SliceId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fresh: Vec<Slice> = texts
            .into_iter()
            .filter_map(|text| Slice::new(text).ok())
            .collect();
        let ids: Vec<SliceId> = fresh.iter().map(Slice::id).collect();
        if ids.is_empty() {
            return ids;
        }

        self.slices.extend(fresh.into_iter().map(|s| (s.id(), s)));
        tracing::debug!(count = ids.len(), total = self.slices.len(), "slices inserted");
        self.events.emit(DocumentEvent::SlicesInserted { ids: ids.clone() });
        ids
    }

    /// Remove a slice
    ///
    /// Returns `false` when the id is unknown (already deleted). A request in
    /// flight for the slice becomes stale.
    pub fn remove_slice(&mut self, id: SliceId) -> bool {
        let Some(removed) = self.slices.shift_remove(&id) else {
            return false;
        };
        if let Some(ticket) = removed.in_flight() {
            tracing::debug!(slice = %id, %ticket, "deleted slice with request in flight");
        }
        self.events.emit(DocumentEvent::SliceRemoved { id });
        true
    }

    /// Commit `text` as a slice's accepted text
    ///
    /// # Errors
    /// - `DocumentError::UnknownSlice` if absent
    /// - `DocumentError::Slice` if the slice is loading or `text` is blank
    pub fn replace_slice_text(&mut self, id: SliceId, text: &str) -> Result<(), DocumentError> {
        let slice = self.slice_mut(id)?;
        slice.commit_text(text)?;
        let committed = slice.current_text().to_string();
        self.committed(id, committed);
        Ok(())
    }

    /// All accepted text joined by blank lines
    ///
    /// Open proposals and edit buffers are never included.
    #[must_use]
    pub fn export_text(&self) -> String {
        self.slices
            .values()
            .map(Slice::current_text)
            .collect::<Vec<_>>()
            .join(SLICE_SEPARATOR)
    }

    /// Move a slice to `Loading` under a fresh ticket
    ///
    /// # Errors
    /// - `DocumentError::UnknownSlice` if absent
    /// - `DocumentError::Slice` if the slice rejects the action
    pub fn begin_generation(
        &mut self,
        id: SliceId,
        action: SliceAction,
    ) -> Result<PendingGeneration, DocumentError> {
        let ticket = self.last_ticket.next();
        let pending = self.slice_mut(id)?.begin_generation(action, ticket)?;
        self.last_ticket = ticket;
        self.state_changed(id, SliceState::Loading);
        Ok(pending)
    }

    /// Apply a response to the slice waiting on `ticket`
    ///
    /// Returns the proposal.
    ///
    /// # Errors
    /// - `DocumentError::UnknownSlice` if the slice was deleted meanwhile
    /// - `DocumentError::Slice` if the ticket is stale or the text is empty
    pub fn complete_generation(
        &mut self,
        id: SliceId,
        ticket: RequestTicket,
        response_text: &str,
        cleaner: &TextCleaner,
    ) -> Result<String, DocumentError> {
        let slice = self.slice_mut(id)?;
        let result = slice
            .complete_generation(ticket, response_text, cleaner)
            .map(str::to_string);
        let state = slice.state();
        if state != SliceState::Loading {
            self.state_changed(id, state);
        }
        Ok(result?)
    }

    /// Return a loading slice to `Idle` if it still waits on `ticket`
    ///
    /// # Errors
    /// - `DocumentError::UnknownSlice` if absent
    /// - `DocumentError::Slice` if the ticket is stale
    pub fn release(&mut self, id: SliceId, ticket: RequestTicket) -> Result<(), DocumentError> {
        self.slice_mut(id)?.release(ticket)?;
        self.state_changed(id, SliceState::Idle);
        Ok(())
    }

    /// Cancel the slice's in-flight request
    ///
    /// # Errors
    /// - `DocumentError::UnknownSlice` if absent
    /// - `DocumentError::Slice` unless loading
    pub fn cancel(&mut self, id: SliceId) -> Result<RequestTicket, DocumentError> {
        let ticket = self.slice_mut(id)?.cancel()?;
        self.state_changed(id, SliceState::Idle);
        Ok(ticket)
    }

    /// Start manual editing
    ///
    /// # Errors
    /// - `DocumentError::UnknownSlice` if absent
    /// - `DocumentError::Slice` unless idle
    pub fn edit(&mut self, id: SliceId) -> Result<(), DocumentError> {
        self.slice_mut(id)?.edit()?;
        self.state_changed(id, SliceState::Editing);
        Ok(())
    }

    /// Record live edit input
    ///
    /// # Errors
    /// - `DocumentError::UnknownSlice` if absent
    /// - `DocumentError::Slice` unless editing
    pub fn on_edit_input(&mut self, id: SliceId, text: impl Into<String>) -> Result<(), DocumentError> {
        self.slice_mut(id)?.on_edit_input(text)?;
        Ok(())
    }

    /// Commit the slice's open alternative
    ///
    /// Returns the new accepted text.
    ///
    /// # Errors
    /// - `DocumentError::UnknownSlice` if absent
    /// - `DocumentError::Slice` unless proposed or editing
    pub fn accept(&mut self, id: SliceId) -> Result<String, DocumentError> {
        let committed = self.slice_mut(id)?.accept()?.to_string();
        self.committed(id, committed.clone());
        Ok(committed)
    }

    /// Drop the slice's open alternative
    ///
    /// # Errors
    /// - `DocumentError::UnknownSlice` if absent
    /// - `DocumentError::Slice` unless proposed or editing
    pub fn discard(&mut self, id: SliceId) -> Result<(), DocumentError> {
        self.slice_mut(id)?.discard()?;
        self.state_changed(id, SliceState::Idle);
        Ok(())
    }

    fn slice_mut(&mut self, id: SliceId) -> Result<&mut Slice, DocumentError> {
        self.slices
            .get_mut(&id)
            .ok_or(DocumentError::UnknownSlice(id))
    }

    fn state_changed(&self, id: SliceId, state: SliceState) {
        self.events.emit(DocumentEvent::SliceStateChanged { id, state });
    }

    fn committed(&self, id: SliceId, text: String) {
        self.events.emit(DocumentEvent::SliceCommitted { id, text });
        self.state_changed(id, SliceState::Idle);
    }
}

impl Default for DocumentModel {
    fn default() -> Self {
        Self::new(None)
    }
}
