//! Generation orchestrator
//!
//! Glues the generation service to the document:
//! - Slice actions (summarize, regenerate, extend) become requests whose
//!   responses land as proposals on the addressed slice
//! - Document extension chains the last slice (or the topic) into a
//!   `GENERATE` request and appends the resulting paragraphs
//! - Manual edits, accept, discard and delete are forwarded as-is
//!
//! The document lock is never held across a request. Each slice request
//! carries a ticket; a response is applied only while the slice still
//! exists and still waits on that ticket.

use crate::client::{split_paragraphs, GenerationClient, GenerationRequest, GenerationResponse};
use crate::document::{DocumentModel, DocumentSnapshot};
use crate::error::{ClientError, DocumentError, QuillError};
use crate::events::{DocumentEvent, EventSender};
use crate::types::{ActionOutcome, ExtendOutcome, Ignored, QuillConfig};
use parking_lot::Mutex;
use quill_slice::{
    GenerationAction, RequestTicket, Slice, SliceAction, SliceId, SliceState, SliceView,
    TextCleaner,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Drives one document session against a generation service
#[derive(Debug)]
pub struct GenerationOrchestrator<C> {
    /// Configuration
    config: QuillConfig,
    /// Generation service
    client: C,
    /// Proposal post-processing
    cleaner: TextCleaner,
    /// The document (single owner of all slices)
    document: Mutex<DocumentModel>,
    /// Change events
    events: EventSender,
    /// Document-level loading indicator
    extending: AtomicBool,
}

impl<C: GenerationClient> GenerationOrchestrator<C> {
    /// Create orchestrator over an empty document without a topic
    #[must_use]
    pub fn new(client: C, config: QuillConfig) -> Self {
        let events = EventSender::new(config.event_capacity);
        let document = DocumentModel::with_events(None, events.clone());
        Self::with_document(client, config, document)
    }

    /// Create orchestrator over an empty document about `topic`
    #[must_use]
    pub fn with_prompt(client: C, config: QuillConfig, topic: impl Into<String>) -> Self {
        let events = EventSender::new(config.event_capacity);
        let document = DocumentModel::with_events(Some(topic.into()), events.clone());
        Self::with_document(client, config, document)
    }

    /// Create orchestrator over an existing document
    #[must_use]
    pub fn with_document(client: C, config: QuillConfig, document: DocumentModel) -> Self {
        Self {
            cleaner: TextCleaner::new(config.cleanup),
            events: document.events().clone(),
            document: Mutex::new(document),
            extending: AtomicBool::new(false),
            config,
            client,
        }
    }

    /// Start a document about `topic` and fill it with its first paragraphs
    ///
    /// # Errors
    /// - `QuillError::Generation` if the first request fails
    pub async fn bootstrap(
        client: C,
        config: QuillConfig,
        topic: impl Into<String>,
    ) -> Result<Self, QuillError> {
        let orchestrator = Self::with_prompt(client, config, topic);
        orchestrator.extend_document().await?;
        Ok(orchestrator)
    }

    /// Append the next paragraphs to the document
    ///
    /// # Workflow
    /// 1. Seed from the last slice, or from the prefixed topic
    /// 2. Raise the loading indicator (one extension at a time)
    /// 3. Request `GENERATE` with the seed
    /// 4. Split the result on blank lines and append non-blank paragraphs
    ///
    /// The loading indicator is lowered on every exit path.
    ///
    /// # Errors
    /// - `QuillError::Generation` if the request fails; the document is
    ///   left unchanged
    pub async fn extend_document(&self) -> Result<ExtendOutcome, QuillError> {
        let seed = self
            .document
            .lock()
            .extension_seed(&self.config.generation_prompt_prefix);
        let Some(seed) = seed else {
            tracing::debug!("nothing to extend from");
            return Ok(ExtendOutcome::Ignored(Ignored::NothingToExtend));
        };

        let Some(_loading) = LoadingIndicator::raise(&self.extending, &self.events) else {
            tracing::debug!("extension already in flight");
            return Ok(ExtendOutcome::Ignored(Ignored::ExtendInFlight));
        };

        tracing::info!(seed_len = seed.len(), "extending document");
        let text = match self
            .request(GenerationRequest::new(GenerationAction::Generate, seed))
            .await
        {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "document extension failed");
                return Err(err.into());
            }
        };

        let paragraphs = split_paragraphs(&text);
        if paragraphs.is_empty() {
            tracing::debug!("extension returned no paragraphs");
            return Ok(ExtendOutcome::Ignored(Ignored::EmptyResult));
        }

        let ids = self.document.lock().insert_slices(paragraphs);
        tracing::info!(appended = ids.len(), "document extended");
        Ok(ExtendOutcome::Appended(ids))
    }

    /// Propose a summary of the slice
    ///
    /// # Errors
    /// - `QuillError::Generation` if the request fails
    pub async fn summarize(&self, id: SliceId) -> Result<ActionOutcome, QuillError> {
        self.revise(id, SliceAction::Summarize).await
    }

    /// Propose a rewrite of the slice
    ///
    /// # Errors
    /// - `QuillError::Generation` if the request fails
    pub async fn regenerate(&self, id: SliceId) -> Result<ActionOutcome, QuillError> {
        self.revise(id, SliceAction::Regenerate).await
    }

    /// Propose the slice followed by a continuation
    ///
    /// # Errors
    /// - `QuillError::Generation` if the request fails
    pub async fn extend_slice(&self, id: SliceId) -> Result<ActionOutcome, QuillError> {
        self.revise(id, SliceAction::ExtendSlice).await
    }

    /// Run one generation action against a slice
    ///
    /// Rejected actions (slice unknown, not idle, already loading) are
    /// ignored without contacting the service. On failure the slice returns
    /// to `Idle` untouched and the error is returned. Responses for deleted
    /// or cancelled requests are dropped.
    ///
    /// # Errors
    /// - `QuillError::Generation` if the request fails
    pub async fn revise(
        &self,
        id: SliceId,
        action: SliceAction,
    ) -> Result<ActionOutcome, QuillError> {
        let begun = self.document.lock().begin_generation(id, action);
        let pending = match begun {
            Ok(pending) => pending,
            Err(e) => return Ok(ignored(id, action, e.into())),
        };
        let ticket = pending.ticket;
        tracing::debug!(slice = %id, %ticket, action = %pending.action, "generation requested");

        let _release = ReleaseOnDrop {
            document: &self.document,
            slice: id,
            ticket,
        };
        let result = self
            .request(GenerationRequest::new(pending.action, pending.prompt))
            .await;

        let mut document = self.document.lock();
        match result {
            Ok(text) => match document.complete_generation(id, ticket, &text, &self.cleaner) {
                Ok(_) => Ok(ActionOutcome::Applied(Some(SliceState::Proposed))),
                Err(DocumentError::UnknownSlice(_)) => {
                    Ok(ignored(id, action, Ignored::StaleResponse(ticket)))
                }
                Err(e) => Ok(ignored(id, action, e.into())),
            },
            Err(err) => match document.release(id, ticket) {
                Ok(()) => {
                    tracing::warn!(slice = %id, %ticket, error = %err, "slice generation failed");
                    Err(err.into())
                }
                Err(_) => Ok(ignored(id, action, Ignored::StaleResponse(ticket))),
            },
        }
    }

    /// Abandon the slice's in-flight request
    pub fn cancel(&self, id: SliceId) -> ActionOutcome {
        self.apply(id, SliceAction::Cancel, |doc| doc.cancel(id).map(|_| ()))
    }

    /// Start manual editing
    pub fn edit(&self, id: SliceId) -> ActionOutcome {
        self.apply(id, SliceAction::Edit, |doc| doc.edit(id))
    }

    /// Record live edit input
    pub fn on_edit_input(&self, id: SliceId, text: impl Into<String>) -> ActionOutcome {
        let text = text.into();
        self.apply(id, SliceAction::EditInput, move |doc| doc.on_edit_input(id, text))
    }

    /// Commit the slice's proposal or edit
    pub fn accept(&self, id: SliceId) -> ActionOutcome {
        self.apply(id, SliceAction::Accept, |doc| doc.accept(id).map(|_| ()))
    }

    /// Drop the slice's proposal or edit
    pub fn discard(&self, id: SliceId) -> ActionOutcome {
        self.apply(id, SliceAction::Discard, |doc| doc.discard(id))
    }

    /// Commit externally supplied text for a slice
    pub fn replace_slice_text(&self, id: SliceId, text: &str) -> ActionOutcome {
        self.apply(id, SliceAction::Accept, |doc| doc.replace_slice_text(id, text))
    }

    /// Remove the slice; a request in flight for it becomes stale
    pub fn delete(&self, id: SliceId) -> ActionOutcome {
        if self.document.lock().remove_slice(id) {
            tracing::debug!(slice = %id, "slice deleted");
            ActionOutcome::Applied(None)
        } else {
            ignored(id, SliceAction::Delete, Ignored::UnknownSlice(id))
        }
    }

    /// Accepted text of the whole document
    #[must_use]
    pub fn export_text(&self) -> String {
        self.document.lock().export_text()
    }

    /// Document heading derived from the topic
    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.document
            .lock()
            .title(&self.config.generation_prompt_prefix)
    }

    /// Presentation snapshot of the whole document
    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        self.document.lock().snapshot()
    }

    /// Presentation view of one slice
    #[must_use]
    pub fn view(&self, id: SliceId) -> Option<SliceView> {
        self.document.lock().get(id).map(Slice::view)
    }

    /// Slice ids in reading order
    #[must_use]
    pub fn slice_ids(&self) -> Vec<SliceId> {
        self.document.lock().ids()
    }

    /// Read the document under its lock
    pub fn read<R>(&self, f: impl FnOnce(&DocumentModel) -> R) -> R {
        f(&*self.document.lock())
    }

    /// Check if a document extension is running
    #[inline]
    #[must_use]
    pub fn is_extending(&self) -> bool {
        self.extending.load(Ordering::Acquire)
    }

    /// Subscribe to change events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.events.subscribe()
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &QuillConfig {
        &self.config
    }

    /// Get generation client
    #[inline]
    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    fn apply(
        &self,
        id: SliceId,
        action: SliceAction,
        f: impl FnOnce(&mut DocumentModel) -> Result<(), DocumentError>,
    ) -> ActionOutcome {
        let mut document = self.document.lock();
        match f(&mut *document) {
            Ok(()) => ActionOutcome::Applied(document.get(id).map(Slice::state)),
            Err(e) => ignored(id, action, e.into()),
        }
    }

    /// Perform one request and extract the first candidate's text
    async fn request(&self, request: GenerationRequest) -> Result<String, ClientError> {
        let call = self.client.generate(request);
        let payload = match self.config.request_timeout() {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ClientError::Timeout {
                    duration_secs: limit.as_secs(),
                })??,
            None => call.await?,
        };

        let response = GenerationResponse::from_payload(&payload)?;
        response
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| ClientError::Malformed("no generations".to_string()))
    }
}

fn ignored(id: SliceId, action: SliceAction, reason: Ignored) -> ActionOutcome {
    tracing::debug!(slice = %id, %action, ?reason, "action ignored");
    ActionOutcome::Ignored(reason)
}

/// Returns a slice to `Idle` if its request is abandoned mid-flight
struct ReleaseOnDrop<'a> {
    document: &'a Mutex<DocumentModel>,
    slice: SliceId,
    ticket: RequestTicket,
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        // No-op once the response has been applied or the slice is gone.
        let _ = self.document.lock().release(self.slice, self.ticket);
    }
}

/// Document-level loading indicator, lowered on drop
struct LoadingIndicator<'a> {
    flag: &'a AtomicBool,
    events: &'a EventSender,
}

impl<'a> LoadingIndicator<'a> {
    fn raise(flag: &'a AtomicBool, events: &'a EventSender) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        events.emit(DocumentEvent::ExtendStarted);
        Some(Self { flag, events })
    }
}

impl Drop for LoadingIndicator<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.events.emit(DocumentEvent::ExtendFinished);
    }
}
