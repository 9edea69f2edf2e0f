//! One paragraph of a document and its revision lifecycle
//!
//! A slice holds three pieces of text:
//! - `current_text`: accepted content, the only text that is ever exported
//! - `pending_text`: an open proposal (or the seed of a manual edit)
//! - `edit_buffer`: live user input while editing
//!
//! All fields change only through the transitions below. Proposals and edits
//! share the pending slot, so accept and discard are always a single two-way
//! decision.

use crate::cleanup::TextCleaner;
use crate::error::SliceError;
use crate::id::{RequestTicket, SliceId};
use crate::state::{validate_action, GenerationAction, SliceAction, SliceState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Loading {
        ticket: RequestTicket,
        action: GenerationAction,
    },
    Proposed,
    Editing,
}

/// A generation request a slice has committed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingGeneration {
    /// Slice the request belongs to
    pub slice: SliceId,
    /// Ticket the response must present
    pub ticket: RequestTicket,
    /// Service action tag
    pub action: GenerationAction,
    /// Prompt sent to the service (the slice's accepted text)
    pub prompt: String,
}

/// Read-only view handed to presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceView {
    /// Slice identifier
    pub id: SliceId,
    /// Current state
    pub state: SliceState,
    /// Accepted text
    pub current_text: String,
    /// Open proposal, if any
    pub pending_text: Option<String>,
}

/// Paragraph-level unit of document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    id: SliceId,
    current_text: String,
    pending_text: Option<String>,
    edit_buffer: Option<String>,
    phase: Phase,
}

impl Slice {
    /// Create slice from a seed paragraph
    ///
    /// # Errors
    /// - `SliceError::EmptyText` if the paragraph is blank
    pub fn new(text: impl AsRef<str>) -> Result<Self, SliceError> {
        Self::with_id(SliceId::new(), text)
    }

    /// Create slice with a caller-chosen identifier
    ///
    /// # Errors
    /// - `SliceError::EmptyText` if the paragraph is blank
    pub fn with_id(id: SliceId, text: impl AsRef<str>) -> Result<Self, SliceError> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return Err(SliceError::EmptyText);
        }
        Ok(Self {
            id,
            current_text: text.to_string(),
            pending_text: None,
            edit_buffer: None,
            phase: Phase::Idle,
        })
    }

    /// Get slice ID
    #[inline]
    #[must_use]
    pub fn id(&self) -> SliceId {
        self.id
    }

    /// Get observable state
    #[must_use]
    pub fn state(&self) -> SliceState {
        match self.phase {
            Phase::Idle => SliceState::Idle,
            Phase::Loading { .. } => SliceState::Loading,
            Phase::Proposed => SliceState::Proposed,
            Phase::Editing => SliceState::Editing,
        }
    }

    /// Accepted text
    #[inline]
    #[must_use]
    pub fn current_text(&self) -> &str {
        &self.current_text
    }

    /// Open proposal
    #[inline]
    #[must_use]
    pub fn pending_text(&self) -> Option<&str> {
        self.pending_text.as_deref()
    }

    /// Live edit input
    #[inline]
    #[must_use]
    pub fn edit_buffer(&self) -> Option<&str> {
        self.edit_buffer.as_deref()
    }

    /// Ticket of the request in flight, if loading
    #[must_use]
    pub fn in_flight(&self) -> Option<RequestTicket> {
        match self.phase {
            Phase::Loading { ticket, .. } => Some(ticket),
            _ => None,
        }
    }

    /// Snapshot for presentation
    #[must_use]
    pub fn view(&self) -> SliceView {
        SliceView {
            id: self.id,
            state: self.state(),
            current_text: self.current_text.clone(),
            pending_text: self.pending_text.clone(),
        }
    }

    /// Start a summarize, regenerate or extend request
    ///
    /// The slice moves to `Loading` and remembers `ticket`; the returned
    /// request carries the accepted text as prompt.
    ///
    /// # Errors
    /// - `SliceError::InvalidTransition` if the action issues no request or
    ///   the slice is not idle (including a request already in flight)
    pub fn begin_generation(
        &mut self,
        action: SliceAction,
        ticket: RequestTicket,
    ) -> Result<PendingGeneration, SliceError> {
        let Some(generation) = action.generation() else {
            return Err(SliceError::invalid(self.state(), action));
        };
        validate_action(self.state(), action)?;

        self.phase = Phase::Loading {
            ticket,
            action: generation,
        };
        Ok(PendingGeneration {
            slice: self.id,
            ticket,
            action: generation,
            prompt: self.current_text.clone(),
        })
    }

    /// Apply a successful response
    ///
    /// Summaries and regenerations propose the cleaned text; extensions
    /// propose the accepted text followed by a newline and the cleaned text.
    /// Any leftover edit buffer is dropped.
    ///
    /// # Errors
    /// - `SliceError::StaleTicket` if the slice is not waiting on `ticket`
    /// - `SliceError::EmptyResult` if nothing survives cleanup; the slice
    ///   returns to `Idle`
    pub fn complete_generation(
        &mut self,
        ticket: RequestTicket,
        response_text: &str,
        cleaner: &TextCleaner,
    ) -> Result<&str, SliceError> {
        let action = match self.phase {
            Phase::Loading { ticket: held, action } if held == ticket => action,
            _ => return Err(SliceError::StaleTicket { ticket }),
        };

        let cleaned = cleaner.clean(response_text);
        if cleaned.trim().is_empty() {
            self.phase = Phase::Idle;
            return Err(SliceError::EmptyResult);
        }

        let proposal = match action {
            GenerationAction::Extend => format!("{}\n{}", self.current_text, cleaned),
            _ => cleaned,
        };

        self.edit_buffer = None;
        self.phase = Phase::Proposed;
        Ok(self.pending_text.insert(proposal).as_str())
    }

    /// Release an in-flight request without a proposal
    ///
    /// Used for failed requests, explicit cancellation and abandoned futures.
    ///
    /// # Errors
    /// - `SliceError::StaleTicket` if the slice is not waiting on `ticket`
    pub fn release(&mut self, ticket: RequestTicket) -> Result<(), SliceError> {
        match self.phase {
            Phase::Loading { ticket: held, .. } if held == ticket => {
                self.phase = Phase::Idle;
                Ok(())
            }
            _ => Err(SliceError::StaleTicket { ticket }),
        }
    }

    /// Cancel whatever request is in flight
    ///
    /// # Errors
    /// - `SliceError::InvalidTransition` if the slice is not loading
    pub fn cancel(&mut self) -> Result<RequestTicket, SliceError> {
        validate_action(self.state(), SliceAction::Cancel)?;
        let ticket = self
            .in_flight()
            .ok_or_else(|| SliceError::invalid(self.state(), SliceAction::Cancel))?;
        self.phase = Phase::Idle;
        Ok(ticket)
    }

    /// Start manual editing, seeded with the accepted text
    ///
    /// # Errors
    /// - `SliceError::InvalidTransition` unless idle
    pub fn edit(&mut self) -> Result<(), SliceError> {
        validate_action(self.state(), SliceAction::Edit)?;
        self.pending_text = Some(self.current_text.clone());
        self.edit_buffer = Some(String::new());
        self.phase = Phase::Editing;
        Ok(())
    }

    /// Record raw text typed by the user
    ///
    /// # Errors
    /// - `SliceError::InvalidTransition` unless editing
    pub fn on_edit_input(&mut self, text: impl Into<String>) -> Result<(), SliceError> {
        validate_action(self.state(), SliceAction::EditInput)?;
        self.edit_buffer = Some(text.into());
        Ok(())
    }

    /// Commit the open alternative
    ///
    /// A non-blank edit buffer wins (trimmed); otherwise the pending text is
    /// committed. Returns the new accepted text.
    ///
    /// # Errors
    /// - `SliceError::InvalidTransition` unless proposed or editing
    /// - `SliceError::EmptyText` if there is nothing to commit
    pub fn accept(&mut self) -> Result<&str, SliceError> {
        validate_action(self.state(), SliceAction::Accept)?;

        let edited = self
            .edit_buffer
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let committed = match (edited, self.pending_text.as_deref()) {
            (Some(edited), _) => edited.to_string(),
            (None, Some(pending)) if !pending.trim().is_empty() => pending.to_string(),
            _ => return Err(SliceError::EmptyText),
        };

        self.current_text = committed;
        self.pending_text = None;
        self.edit_buffer = None;
        self.phase = Phase::Idle;
        Ok(&self.current_text)
    }

    /// Drop the open alternative, keeping the accepted text
    ///
    /// # Errors
    /// - `SliceError::InvalidTransition` unless proposed or editing
    pub fn discard(&mut self) -> Result<(), SliceError> {
        validate_action(self.state(), SliceAction::Discard)?;
        self.pending_text = None;
        self.edit_buffer = None;
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Commit externally supplied text
    ///
    /// Closes any open proposal or edit. Refused while a request is in
    /// flight so a late response cannot be computed from outdated text.
    ///
    /// # Errors
    /// - `SliceError::InvalidTransition` while loading
    /// - `SliceError::EmptyText` if `text` is blank
    pub fn commit_text(&mut self, text: impl AsRef<str>) -> Result<(), SliceError> {
        if matches!(self.phase, Phase::Loading { .. }) {
            return Err(SliceError::invalid(SliceState::Loading, SliceAction::Accept));
        }
        let text = text.as_ref().trim();
        if text.is_empty() {
            return Err(SliceError::EmptyText);
        }
        self.current_text = text.to_string();
        self.pending_text = None;
        self.edit_buffer = None;
        self.phase = Phase::Idle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::CleanupOptions;
    use pretty_assertions::assert_eq;

    fn slice(text: &str) -> Slice {
        Slice::new(text).unwrap()
    }

    #[test]
    fn new_slice_is_idle_and_trimmed() {
        let s = slice("  Hello there. ");
        assert_eq!(s.state(), SliceState::Idle);
        assert_eq!(s.current_text(), "Hello there.");
        assert!(s.pending_text().is_none());
        assert!(s.edit_buffer().is_none());
    }

    #[test]
    fn blank_slice_rejected() {
        assert_eq!(Slice::new(" \n ").unwrap_err(), SliceError::EmptyText);
    }

    #[test]
    fn summarize_proposes_cleaned_text() {
        let mut s = slice("A long paragraph.");
        let req = s.begin_generation(SliceAction::Summarize, RequestTicket(1)).unwrap();
        assert_eq!(req.action, GenerationAction::Summarize);
        assert_eq!(req.prompt, "A long paragraph.");
        assert_eq!(s.state(), SliceState::Loading);

        let proposal = s
            .complete_generation(RequestTicket(1), "  - Short-ish. ", &TextCleaner::default())
            .unwrap()
            .to_string();
        assert_eq!(proposal, " Shortish.");
        assert_eq!(s.state(), SliceState::Proposed);
        assert_eq!(s.current_text(), "A long paragraph.");
    }

    #[test]
    fn extend_keeps_original_text() {
        let mut s = slice("First.");
        s.begin_generation(SliceAction::ExtendSlice, RequestTicket(3)).unwrap();
        s.complete_generation(RequestTicket(3), " Second. ", &TextCleaner::default())
            .unwrap();
        assert_eq!(s.pending_text(), Some("First.\nSecond."));
    }

    #[test]
    fn second_request_rejected_while_loading() {
        let mut s = slice("Text.");
        s.begin_generation(SliceAction::Summarize, RequestTicket(1)).unwrap();
        let err = s
            .begin_generation(SliceAction::Regenerate, RequestTicket(2))
            .unwrap_err();
        assert!(err.is_invalid_transition());
        assert_eq!(s.in_flight(), Some(RequestTicket(1)));
    }

    #[test]
    fn stale_ticket_ignored() {
        let mut s = slice("Text.");
        s.begin_generation(SliceAction::Summarize, RequestTicket(1)).unwrap();
        s.cancel().unwrap();
        let err = s
            .complete_generation(RequestTicket(1), "late", &TextCleaner::default())
            .unwrap_err();
        assert_eq!(err, SliceError::StaleTicket { ticket: RequestTicket(1) });
        assert_eq!(s.state(), SliceState::Idle);
        assert!(s.pending_text().is_none());
    }

    #[test]
    fn empty_result_returns_to_idle() {
        let mut s = slice("Text.");
        s.begin_generation(SliceAction::Regenerate, RequestTicket(1)).unwrap();
        let err = s
            .complete_generation(RequestTicket(1), " -- ", &TextCleaner::default())
            .unwrap_err();
        assert_eq!(err, SliceError::EmptyResult);
        assert_eq!(s.state(), SliceState::Idle);
    }

    #[test]
    fn dashes_kept_when_cleanup_disabled() {
        let mut s = slice("Text.");
        s.begin_generation(SliceAction::Regenerate, RequestTicket(1)).unwrap();
        let cleaner = TextCleaner::new(CleanupOptions::default().with_strip_artifact_dashes(false));
        s.complete_generation(RequestTicket(1), "well-known", &cleaner).unwrap();
        assert_eq!(s.pending_text(), Some("well-known"));
    }

    #[test]
    fn release_restores_idle() {
        let mut s = slice("Text.");
        s.begin_generation(SliceAction::Summarize, RequestTicket(4)).unwrap();
        assert!(s.release(RequestTicket(5)).is_err());
        s.release(RequestTicket(4)).unwrap();
        assert_eq!(s.state(), SliceState::Idle);
        assert_eq!(s.current_text(), "Text.");
    }

    #[test]
    fn edit_seeds_pending_and_opens_buffer() {
        let mut s = slice("Draft.");
        s.edit().unwrap();
        assert_eq!(s.state(), SliceState::Editing);
        assert_eq!(s.pending_text(), Some("Draft."));
        assert_eq!(s.edit_buffer(), Some(""));
    }

    #[test]
    fn accept_prefers_edit_buffer() {
        let mut s = slice("Draft.");
        s.edit().unwrap();
        s.on_edit_input("  Final text.  ").unwrap();
        assert_eq!(s.accept().unwrap(), "Final text.");
        assert_eq!(s.state(), SliceState::Idle);
        assert!(s.pending_text().is_none());
        assert!(s.edit_buffer().is_none());
    }

    #[test]
    fn accept_with_blank_buffer_falls_back_to_pending() {
        let mut s = slice("Draft.");
        s.edit().unwrap();
        s.on_edit_input("   ").unwrap();
        assert_eq!(s.accept().unwrap(), "Draft.");
    }

    #[test]
    fn edit_input_outside_editing_rejected() {
        let mut s = slice("Draft.");
        assert!(s.on_edit_input("x").unwrap_err().is_invalid_transition());
        assert!(s.edit_buffer().is_none());
    }

    #[test]
    fn discard_then_accept_is_noop() {
        let mut s = slice("Original.");
        s.begin_generation(SliceAction::Regenerate, RequestTicket(1)).unwrap();
        s.complete_generation(RequestTicket(1), "Other.", &TextCleaner::default())
            .unwrap();
        s.discard().unwrap();
        assert!(s.accept().unwrap_err().is_invalid_transition());
        assert_eq!(s.current_text(), "Original.");
    }

    #[test]
    fn commit_text_refused_while_loading() {
        let mut s = slice("Text.");
        s.begin_generation(SliceAction::Summarize, RequestTicket(1)).unwrap();
        assert!(s.commit_text("Other.").is_err());
        assert_eq!(s.current_text(), "Text.");
    }

    #[test]
    fn commit_text_closes_proposal() {
        let mut s = slice("Text.");
        s.edit().unwrap();
        s.commit_text(" Replaced. ").unwrap();
        assert_eq!(s.current_text(), "Replaced.");
        assert_eq!(s.state(), SliceState::Idle);
        assert!(s.pending_text().is_none());
    }

    #[test]
    fn view_mirrors_fields() {
        let mut s = slice("Text.");
        s.edit().unwrap();
        let view = s.view();
        assert_eq!(view.id, s.id());
        assert_eq!(view.state, SliceState::Editing);
        assert_eq!(view.pending_text.as_deref(), Some("Text."));
    }
}
